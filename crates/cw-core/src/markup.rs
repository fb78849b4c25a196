//! Escaping and element composition for the rendered post markup.

/// How newlines are written out by [`escape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreaks {
    /// `\n` becomes `<br>`.
    Block,
    /// `\n` becomes the `&#10;` entity.
    Entity,
    /// `\n` is left as is.
    Keep,
}

/// Escape markup metacharacters and convert line breaks.
pub fn escape(text: &str, breaks: LineBreaks) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    match breaks {
        LineBreaks::Block => escaped.replace('\n', "<br>"),
        LineBreaks::Entity => escaped.replace('\n', "&#10;"),
        LineBreaks::Keep => escaped,
    }
}

/// Escape a value for use inside a double-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    escape(value, LineBreaks::Entity).replace('"', "&quot;")
}

/// A tagged element with attributes, rendered around its children.
#[derive(Debug, Clone, Default)]
pub struct Elem {
    tag: String,
    attrs: Vec<(String, String)>,
    class: Option<String>,
}

impl Elem {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class = (!class.is_empty()).then(|| class.to_string());
        self
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.push((key.to_string(), value.to_string()));
        self
    }

    /// Render the element around already-rendered children.
    pub fn render<S: AsRef<str>>(&self, children: &[S]) -> String {
        let mut out = format!("<{}", self.tag);
        let class = self.class.as_ref().map(|c| ("class", c.as_str()));
        for (key, value) in self
            .attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(class)
        {
            out.push_str(&format!(" {key}=\"{}\"", escape_attr(value)));
        }
        out.push('>');
        for child in children {
            out.push_str(child.as_ref());
        }
        out.push_str(&format!("</{}>", self.tag));
        out
    }

    /// Render with no children.
    pub fn empty(&self) -> String {
        self.render::<&str>(&[])
    }
}

pub fn div(class: &str) -> Elem {
    Elem::new("div").class(class)
}

pub fn span(class: &str) -> Elem {
    Elem::new("span").class(class)
}

/// Blinking "still streaming" marker.
pub fn cursor() -> String {
    span("tw-end-cursor").empty()
}
