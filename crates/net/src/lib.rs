mod client;
mod content;
mod handler;
mod request;
mod response;
mod server;

pub use client::Client;
pub use client::ClientConfig;
pub use client::ClientError;
pub use content::DeflateDecoder;
pub use content::GzipDecoder;
pub use content::decode_content;
pub use content::default_registry;
pub use handler::BoxError;
pub use handler::FnHandler;
pub use handler::Handler;
pub use handler::handler_fn;
pub use request::Request;
pub use request::RequestBuilder;
pub use response::Response;
pub use response::ResponseBuilder;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
pub use server::ServerConnection;
