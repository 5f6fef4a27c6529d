//! Page template registry.
//!
//! A template is a fixed, ordered field schema. The registry is built once at
//! start-up and never mutated; it drives both the admin forms and server-side
//! validation of page data.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    RichText,
    Image,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(name: &'static str, label: &'static str, kind: FieldKind, required: bool) -> FieldSchema {
    FieldSchema {
        name,
        label,
        kind,
        required,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub fields: Vec<FieldSchema>,
}

impl Template {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<&'static str, Template>,
}

impl TemplateRegistry {
    /// The templates shipped with the site.
    pub fn builtin() -> Self {
        use FieldKind::*;

        let templates = [
            Template {
                id: "basic",
                name: "Basic page",
                fields: vec![
                    field("title", "Title", Text, true),
                    field("content", "Content", RichText, true),
                ],
            },
            Template {
                id: "text-image",
                name: "Text with image",
                fields: vec![
                    field("title", "Title", Text, true),
                    field("content", "Content", RichText, true),
                    field("image", "Image", Image, true),
                    field("image_alt", "Image description", Text, false),
                    field("image_position", "Image position", Text, false),
                ],
            },
            Template {
                id: "gallery",
                name: "Gallery",
                fields: vec![
                    field("title", "Title", Text, true),
                    field("introduction", "Introduction", RichText, false),
                    field("images", "Images", List, true),
                ],
            },
            Template {
                id: "landing",
                name: "Landing page",
                fields: vec![
                    field("title", "Title", Text, true),
                    field("hero_title", "Hero title", Text, true),
                    field("hero_subtitle", "Hero subtitle", Text, false),
                    field("hero_image", "Hero image", Image, false),
                    field("cta_text", "Button text", Text, false),
                    field("cta_link", "Button link", Text, false),
                    field("sections", "Sections", List, false),
                ],
            },
            Template {
                id: "contact",
                name: "Contact",
                fields: vec![
                    field("title", "Title", Text, true),
                    field("introduction", "Introduction", RichText, false),
                    field("email", "E-mail", Text, false),
                    field("phone", "Phone", Text, false),
                    field("address", "Address", Text, false),
                    field("map_url", "Map link", Text, false),
                ],
            },
            Template {
                id: "blog",
                name: "Blog post",
                fields: vec![
                    field("title", "Title", Text, true),
                    field("excerpt", "Excerpt", Text, false),
                    field("content", "Content", RichText, true),
                    field("featured_image", "Featured image", Image, false),
                    field("author", "Author", Text, false),
                    field("tags", "Tags", List, false),
                ],
            },
        ];

        Self::from_templates(templates)
    }

    pub fn from_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn get(&self, template_id: &str) -> Option<&Template> {
        self.templates.get(template_id)
    }

    pub fn get_schema(&self, template_id: &str) -> Option<&[FieldSchema]> {
        self.get(template_id).map(|t| t.fields.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
