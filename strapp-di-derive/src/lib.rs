use crate::attributes::ProducerAttributes;
use crate::producer::expand_producer;
use proc_macro::TokenStream;
use syn::{parse_macro_input, Error, ItemFn};

mod attributes;
mod producer;

/// Registers a function as a producer of a resource named after the function. Parameter names
/// are used as names of resources the producer depends on. See `strapp_di::resource` for details.
#[proc_macro_attribute]
pub fn producer(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut attributes = ProducerAttributes::default();
    let parser = syn::meta::parser(|meta| attributes.parse_meta(meta));
    parse_macro_input!(attr with parser);

    let item = parse_macro_input!(item as ItemFn);
    expand_producer(&item, &attributes)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
