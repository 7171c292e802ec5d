pub mod connection;

pub use connection::ConnectionHandler;
