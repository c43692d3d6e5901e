mod transport;
pub use transport::Transport;
