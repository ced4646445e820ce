pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    CommentStore, CommunityStore, EventStore, GroupStore, LikeDrift, LikeStore, NewComment, NewCommunity,
    NewEvent, NewGroup, NewPost, NewResource, PostChanges, PostStore, SearchStore, Store, StoreResult,
    UserStore, UserUpsert,
};
