use proc_macro::TokenStream;

mod controller;
mod http_methods;

/// Attribute macro marking a struct as a controller mounted under `path`
///
/// Without a path the controller is mounted at `/{TypeName}`.
///
/// # Example
/// ```ignore
/// use trellis::controller;
///
/// #[controller(path = "/users")]
/// pub struct UserController {
///     users: Arc<UserStore>,
/// }
/// ```
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    controller::controller_attribute(attr, item)
}

/// Attribute macro declaring the routes of a `#[controller]` impl block
///
/// Every method carrying a route attribute becomes an action. The
/// attribute takes an optional path (the method name when omitted), and
/// the options `key = "..."`, `schema = <Schema expr>` and
/// `middleware = [<Middleware expr>, ...]`.
///
/// # Example
/// ```ignore
/// #[routes]
/// impl UserController {
///     #[get("/:id")]
///     async fn find(self: Arc<Self>, context: RequestContext) -> HandlerResult {
///         // ...
///     }
///
///     #[post("/", schema = Schema::new().field(Field::body("email").is_email()))]
///     async fn create(self: Arc<Self>, context: RequestContext) -> HandlerResult {
///         // ...
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn routes(attr: TokenStream, item: TokenStream) -> TokenStream {
    controller::routes_attribute(attr, item)
}

/// HTTP GET route inside a `#[routes]` block
#[proc_macro_attribute]
pub fn get(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("get", attr, item)
}

/// HTTP POST route inside a `#[routes]` block
#[proc_macro_attribute]
pub fn post(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("post", attr, item)
}

/// HTTP PUT route inside a `#[routes]` block
#[proc_macro_attribute]
pub fn put(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("put", attr, item)
}

/// HTTP DELETE route inside a `#[routes]` block
#[proc_macro_attribute]
pub fn delete(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("delete", attr, item)
}

/// HTTP PATCH route inside a `#[routes]` block
#[proc_macro_attribute]
pub fn patch(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("patch", attr, item)
}

/// HTTP OPTIONS route inside a `#[routes]` block
#[proc_macro_attribute]
pub fn options(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("options", attr, item)
}

/// HTTP HEAD route inside a `#[routes]` block
#[proc_macro_attribute]
pub fn head(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("head", attr, item)
}

/// Route answering every method the path has no specific route for
#[proc_macro_attribute]
pub fn all(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("all", attr, item)
}

/// Alias of `#[get]`
#[proc_macro_attribute]
pub fn route(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("route", attr, item)
}
