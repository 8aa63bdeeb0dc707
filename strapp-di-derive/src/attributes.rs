use syn::meta::ParseNestedMeta;
use syn::{LitStr, Result};

#[derive(Default)]
pub struct ProducerAttributes {
    pub name: Option<LitStr>,
}

impl ProducerAttributes {
    pub fn parse_meta(&mut self, meta: ParseNestedMeta) -> Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("Unsupported producer property!"))
        }
    }
}
