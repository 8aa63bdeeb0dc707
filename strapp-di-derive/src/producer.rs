use crate::attributes::ProducerAttributes;
use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Error, FnArg, ItemFn, Pat, PatType, Result, ReturnType, Type};

struct Parameter {
    name: String,
    extraction: TokenStream,
}

fn get_parameter(argument: &FnArg) -> Result<Parameter> {
    let FnArg::Typed(PatType { pat, ty, .. }) = argument else {
        return Err(Error::new(
            argument.span(),
            "Producers cannot take a receiver!",
        ));
    };

    let Pat::Ident(ident) = pat.as_ref() else {
        return Err(Error::new(
            pat.span(),
            "Producer parameters must be plain identifiers, since they are used as resource names!",
        ));
    };

    let name = ident.ident.unraw().to_string();
    let extraction = if let Type::Reference(reference) = ty.as_ref() {
        let target = &reference.elem;
        quote! {
            &*arguments.required::<#target>(#name)?
        }
    } else {
        quote! {
            arguments.required::< <#ty as std::ops::Deref>::Target >(#name)?
        }
    };

    Ok(Parameter { name, extraction })
}

fn returns_result(output: &ReturnType) -> bool {
    if let ReturnType::Type(_, ty) = output {
        if let Type::Path(path) = ty.as_ref() {
            return path
                .path
                .segments
                .last()
                .map(|segment| segment.ident == "Result")
                .unwrap_or(false);
        }
    }

    false
}

pub fn expand_producer(item: &ItemFn, attributes: &ProducerAttributes) -> Result<TokenStream> {
    let signature = &item.sig;
    if signature.asyncness.is_some() {
        return Err(Error::new(
            signature.span(),
            "Producers cannot be async!",
        ));
    }

    if !signature.generics.params.is_empty() {
        return Err(Error::new(
            signature.generics.span(),
            "Producers cannot be generic!",
        ));
    }

    let ident = &signature.ident;
    let name = attributes
        .name
        .as_ref()
        .map(|name| name.value())
        .unwrap_or_else(|| ident.unraw().to_string());

    let parameters: Vec<_> = signature.inputs.iter().map(get_parameter).try_collect()?;
    let parameter_count = parameters.len();
    let parameter_names = parameters.iter().map(|parameter| &parameter.name);
    let extractions = parameters.iter().map(|parameter| &parameter.extraction);

    let invocation = if returns_result(&signature.output) {
        quote! {
            #ident(#(#extractions),*).map(strapp_di::value::erase)
        }
    } else {
        quote! {
            Ok(strapp_di::value::erase(#ident(#(#extractions),*)))
        }
    };

    Ok(quote! {
        #item

        const _: () = {
            #[allow(unused_variables)]
            fn __strapp_produce(
                arguments: &strapp_di::value::Arguments,
            ) -> Result<strapp_di::value::ResourceValuePtr, strapp_di::value::ErrorPtr> {
                #invocation
            }

            fn __strapp_register() -> strapp_di::producer_registry::ProducerDefinition {
                let parameters: [&str; #parameter_count] = [#(#parameter_names),*];
                strapp_di::producer_registry::ProducerDefinition::new(
                    #name,
                    strapp_di::resource::Signature::new(parameters),
                    __strapp_produce,
                )
            }

            strapp_di::producer_registry::internal::submit! {
                strapp_di::producer_registry::internal::ProducerRegisterer {
                    register: __strapp_register
                }
            };
        };
    })
}
