pub mod mime;
pub mod request;
pub mod response;

pub use request::RawRequest;
pub use request::RequestPath;
pub use response::HttpResponse;
