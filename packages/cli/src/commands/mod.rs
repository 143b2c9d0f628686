pub mod import;
pub mod init;
pub mod tree;

pub use import::{import, ImportArgs};
pub use init::{init, InitArgs};
pub use tree::{tree, TreeArgs};
