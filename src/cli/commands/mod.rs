mod create_key;
mod init;
mod prune;

pub use create_key::cmd_create_key;
pub use init::cmd_init;
pub use prune::cmd_prune;
