pub mod db;
pub mod live;
pub mod notify;
pub mod paging;

pub use db::ChatStore;
pub use live::LiveStream;
pub use notify::{ChangeHub, StoreChange};
pub use paging::{ChatCursor, ChatPager, KeysetPage, MessageCursor, MessagePager};
