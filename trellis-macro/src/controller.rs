use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, Attribute, Expr, ExprArray, FnArg,
    ImplItem, ImplItemFn, ItemImpl, ItemStruct, LitStr, Meta, Token,
};

/// Attribute names that declare a route, and the method each one binds.
const ROUTE_ATTRS: [(&str, &str); 9] = [
    ("get", "Get"),
    ("post", "Post"),
    ("put", "Put"),
    ("delete", "Delete"),
    ("patch", "Patch"),
    ("options", "Options"),
    ("head", "Head"),
    ("all", "All"),
    ("route", "Get"),
];

struct ControllerArgs {
    path: Option<LitStr>,
}

impl Parse for ControllerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            return Ok(ControllerArgs {
                path: Some(input.parse()?),
            });
        }
        let mut path = None;
        while !input.is_empty() {
            let name: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            if name == "path" {
                path = Some(input.parse()?);
            } else {
                return Err(syn::Error::new(
                    name.span(),
                    format!("unknown controller option `{name}`"),
                ));
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(ControllerArgs { path })
    }
}

pub fn controller_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ControllerArgs);
    let input = parse_macro_input!(item as ItemStruct);
    TokenStream::from(generate_controller_impl(&args, &input))
}

fn generate_controller_impl(args: &ControllerArgs, input: &ItemStruct) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let base_path = match &args.path {
        Some(path) => quote! { ::core::option::Option::Some(#path) },
        None => quote! { ::core::option::Option::None },
    };
    quote! {
        #input

        impl #impl_generics #struct_name #ty_generics #where_clause {
            #[doc(hidden)]
            pub const __TRELLIS_BASE_PATH: ::core::option::Option<&'static str> = #base_path;
        }
    }
}

#[derive(Default)]
struct RouteArgs {
    path: Option<LitStr>,
    key: Option<LitStr>,
    schema: Option<Expr>,
    middleware: Vec<Expr>,
}

impl Parse for RouteArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = RouteArgs::default();
        if input.peek(LitStr) {
            args.path = Some(input.parse()?);
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        while !input.is_empty() {
            let name: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            match name.to_string().as_str() {
                "path" => args.path = Some(input.parse()?),
                "key" => args.key = Some(input.parse()?),
                "schema" => args.schema = Some(input.parse()?),
                "middleware" => {
                    let list: ExprArray = input.parse()?;
                    args.middleware.extend(list.elems);
                }
                other => {
                    return Err(syn::Error::new(
                        name.span(),
                        format!("unknown route option `{other}`"),
                    ))
                }
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }
}

struct RouteInfo {
    method: syn::Ident,
    fn_name: syn::Ident,
    args: RouteArgs,
}

pub fn routes_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemImpl);
    match generate_routes_impl(input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(error) => TokenStream::from(error.to_compile_error()),
    }
}

fn generate_routes_impl(mut input: ItemImpl) -> syn::Result<TokenStream2> {
    let mut routes: Vec<RouteInfo> = Vec::new();

    for item in input.items.iter_mut() {
        if let ImplItem::Fn(method) = item {
            let declared = extract_routes(method)?;
            if !declared.is_empty() {
                check_receiver(method)?;
                method.attrs.retain(|attr| route_method(attr).is_none());
                routes.extend(declared);
            }
        }
    }

    let registrations = routes.iter().map(|route| {
        let method = &route.method;
        let fn_name = &route.fn_name;
        let key = match &route.args.key {
            Some(key) => quote! { #key },
            None => {
                let name = fn_name.to_string();
                quote! { #name }
            }
        };
        let path = route.args.path.iter();
        let schema = route.args.schema.iter();
        let middleware = &route.args.middleware;
        quote! {
            routes
                .add(::trellis::Method::#method, #key, Self::#fn_name)
                #(.path(#path))*
                #(.schema(#schema))*
                #(.middleware(#middleware))*;
        }
    });

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #input

        impl #impl_generics ::trellis::Controller for #self_ty #where_clause {
            fn base_path() -> ::core::option::Option<&'static str> {
                <#self_ty>::__TRELLIS_BASE_PATH
            }

            #[allow(unused_variables)]
            fn routes(routes: &mut ::trellis::RouteSet<Self>) {
                #(#registrations)*
            }
        }
    })
}

fn route_method(attr: &Attribute) -> Option<&'static str> {
    let ident = attr.path().get_ident()?;
    ROUTE_ATTRS
        .iter()
        .find(|(name, _)| ident == name)
        .map(|(_, variant)| *variant)
}

fn extract_routes(method: &ImplItemFn) -> syn::Result<Vec<RouteInfo>> {
    let mut routes = Vec::new();
    for attr in &method.attrs {
        let Some(variant) = route_method(attr) else {
            continue;
        };
        let args = match &attr.meta {
            Meta::Path(_) => RouteArgs::default(),
            Meta::List(_) => attr.parse_args::<RouteArgs>()?,
            Meta::NameValue(meta) => {
                return Err(syn::Error::new_spanned(
                    meta,
                    "expected `#[get]` or `#[get(\"/path\", ...)]`",
                ))
            }
        };
        routes.push(RouteInfo {
            method: format_ident!("{}", variant),
            fn_name: method.sig.ident.clone(),
            args,
        });
    }
    Ok(routes)
}

fn check_receiver(method: &ImplItemFn) -> syn::Result<()> {
    let valid = match method.sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) => {
            receiver.reference.is_none() && receiver.colon_token.is_some()
        }
        _ => false,
    };
    if valid && method.sig.asyncness.is_some() && method.sig.inputs.len() == 2 {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &method.sig,
            "controller actions must be `async fn(self: Arc<Self>, context: RequestContext) -> HandlerResult`",
        ))
    }
}
