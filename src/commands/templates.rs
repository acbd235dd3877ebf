use anyhow::Result;

use crate::templates::{get_template, Template, TEMPLATES};

pub fn list() -> &'static [Template] {
    TEMPLATES
}

pub fn show(name: &str) -> Result<&'static Template> {
    Ok(get_template(name)?)
}
