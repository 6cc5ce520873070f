pub mod method;
pub mod response;

pub use method::Method;
pub use response::{
    CodeFlags, ControllerResponse, DEFAULT_FILE_TYPE, EnvelopeBody, EnvelopeError,
    ResponseOptions, resolve_code,
};
