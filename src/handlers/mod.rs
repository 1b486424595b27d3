// Resource handlers registered with the dispatch pipeline.
//
// Each handler supplies a capability descriptor (allowed actions, verb
// mapping, default, protected subset) and the matching action
// implementations. Data access goes through the RowStore seam.

pub mod system;
pub mod users;

pub use system::SystemHandler;
pub use users::UsersHandler;
