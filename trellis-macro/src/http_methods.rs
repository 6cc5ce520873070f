use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

/// Route attributes are read by `#[routes]`, which strips them. Reaching
/// this expansion means the attribute sits outside such a block.
pub fn http_method_attribute(method: &str, _attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = TokenStream2::from(item);
    let message = format!("#[{method}] only has an effect inside a #[routes] impl block");
    TokenStream::from(quote! {
        ::core::compile_error!(#message);
        #item
    })
}
