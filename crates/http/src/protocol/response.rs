use http::Response;

/// The head of an outgoing response, before the body is attached.
pub type ResponseHead = Response<()>;
