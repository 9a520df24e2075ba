//! Tag and attribute tables.

const HTML_TAGS: &[&str] = &[
    "html", "body", "base", "head", "link", "meta", "style", "title", "address", "article",
    "aside", "footer", "header", "h1", "h2", "h3", "h4", "h5", "h6", "hgroup", "nav", "section",
    "div", "dd", "dl", "dt", "figcaption", "figure", "picture", "hr", "img", "li", "main", "ol",
    "p", "pre", "ul", "a", "b", "abbr", "bdi", "bdo", "br", "cite", "code", "data", "dfn", "em",
    "i", "kbd", "mark", "q", "rp", "rt", "rtc", "ruby", "s", "samp", "small", "span", "strong",
    "sub", "sup", "time", "u", "var", "wbr", "area", "audio", "map", "track", "video", "embed",
    "object", "param", "source", "canvas", "script", "noscript", "del", "ins", "caption", "col",
    "colgroup", "table", "thead", "tbody", "td", "th", "tr", "button", "datalist", "fieldset",
    "form", "input", "label", "legend", "meter", "optgroup", "option", "output", "progress",
    "select", "textarea", "details", "dialog", "menu", "menuitem", "summary", "content",
    "element", "shadow", "template", "blockquote", "iframe", "tfoot",
];

const SVG_TAGS: &[&str] = &[
    "svg", "animate", "circle", "clippath", "cursor", "defs", "desc", "ellipse", "filter",
    "font-face", "foreignObject", "g", "glyph", "image", "line", "marker", "mask", "missing-glyph",
    "path", "pattern", "polygon", "polyline", "rect", "switch", "symbol", "text", "textpath",
    "tspan", "use", "view",
];

const TEXT_INPUT_TYPES: &[&str] = &["text", "number", "password", "search", "email", "tel", "url"];

const BOOLEAN_ATTRS: &[&str] = &[
    "allowfullscreen", "async", "autofocus", "autoplay", "checked", "compact", "controls",
    "declare", "default", "defaultchecked", "defaultmuted", "defaultselected", "defer", "disabled",
    "enabled", "formnovalidate", "hidden", "indeterminate", "inert", "ismap", "itemscope", "loop",
    "multiple", "muted", "nohref", "noresize", "noshade", "novalidate", "nowrap", "open",
    "pauseonexit", "readonly", "required", "reversed", "scoped", "seamless", "selected",
    "sortable", "truespeed", "typemustmatch", "visible",
];

pub fn is_html_tag(tag: &str) -> bool {
    HTML_TAGS.contains(&tag)
}

pub fn is_svg_tag(tag: &str) -> bool {
    SVG_TAGS.contains(&tag)
}

/// Tags the platform renders natively.
pub fn is_reserved_tag(tag: &str) -> bool {
    is_html_tag(tag) || is_svg_tag(tag)
}

/// Tags handled by the runtime rather than the platform.
pub fn is_built_in_tag(tag: &str) -> bool {
    matches!(tag, "slot" | "component")
}

pub fn is_text_input_type(input_type: &str) -> bool {
    TEXT_INPUT_TYPES.contains(&input_type)
}

/// Attributes whose presence alone carries the meaning.
pub fn is_boolean_attr(name: &str) -> bool {
    BOOLEAN_ATTRS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables() {
        assert!(is_reserved_tag("div"));
        assert!(is_reserved_tag("circle"));
        assert!(!is_reserved_tag("my-widget"));
        assert!(is_built_in_tag("slot"));
        assert!(is_text_input_type("tel"));
        assert!(!is_text_input_type("radio"));
        assert!(is_boolean_attr("disabled"));
    }
}
