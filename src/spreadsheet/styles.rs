//! Fixed style table of written workbooks.
//!
//! Every [`CellStyle`] maps to one `cellXfs` entry whose index equals
//! [`CellStyle::index`], so worksheet cells can reference styles directly.
use crate::error::MdrError;
use crate::grid::CellStyle;
use crate::helpers::xml::XmlWriter;
use crate::spreadsheet::cell::DATE_FORMAT_CODE;
use crate::spreadsheet::cell::DATE_FORMAT_ID;

/// Header fill (yellow)
pub(crate) const HEADER_FILL: &str = "FFFFFF00";
/// Category row fill (green)
pub(crate) const CATEGORY_FILL: &str = "FF92D050";

const NAMESPACE: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

// (size, bold)
const FONTS: [(&str, bool); 4] = [("11", false), ("10", true), ("11", true), ("8", false)];
const FONT_DEFAULT: usize = 0;
const FONT_HEADER: usize = 1;
const FONT_BOLD: usize = 2;
const FONT_BANNER: usize = 3;

const FILL_NONE: usize = 0;
const FILL_HEADER: usize = 2;
const FILL_CATEGORY: usize = 3;

const BORDER_NONE: usize = 0;
const BORDER_THIN: usize = 1;

struct StyleSpec {
    number_format: u32,
    font: usize,
    fill: usize,
    border: usize,
    horizontal: Option<&'static str>,
    wrap: bool,
}

fn spec(style: CellStyle) -> StyleSpec {
    let bordered = |font, fill, horizontal, wrap| StyleSpec {
        number_format: 0,
        font,
        fill,
        border: BORDER_THIN,
        horizontal: Some(horizontal),
        wrap,
    };
    match style {
        CellStyle::Plain => StyleSpec {
            number_format: 0,
            font: FONT_DEFAULT,
            fill: FILL_NONE,
            border: BORDER_NONE,
            horizontal: None,
            wrap: false,
        },
        CellStyle::Banner => bordered(FONT_BANNER, FILL_HEADER, "center", true),
        CellStyle::Header => bordered(FONT_HEADER, FILL_HEADER, "center", true),
        CellStyle::Category => bordered(FONT_BOLD, FILL_CATEGORY, "left", false),
        CellStyle::Identifier => bordered(FONT_BOLD, FILL_NONE, "center", false),
        CellStyle::Centered => bordered(FONT_DEFAULT, FILL_NONE, "center", false),
        CellStyle::Text => bordered(FONT_DEFAULT, FILL_NONE, "left", false),
        CellStyle::Date => StyleSpec {
            number_format: DATE_FORMAT_ID,
            ..bordered(FONT_DEFAULT, FILL_NONE, "center", false)
        },
    }
}

/// Renders `xl/styles.xml`.
pub(crate) fn write_styles() -> Result<Vec<u8>, MdrError> {
    let mut xml = XmlWriter::new()?;
    xml.start("styleSheet", &[("xmlns", NAMESPACE)])?;

    xml.start("numFmts", &[("count", "1")])?;
    xml.empty("numFmt", &[("numFmtId", &DATE_FORMAT_ID.to_string()), ("formatCode", DATE_FORMAT_CODE)])?;
    xml.end("numFmts")?;

    xml.start("fonts", &[("count", &FONTS.len().to_string())])?;
    for (size, bold) in FONTS {
        xml.start("font", &[])?;
        if bold {
            xml.empty("b", &[])?;
        }
        xml.empty("sz", &[("val", size)])?;
        xml.empty("color", &[("rgb", "FF000000")])?;
        xml.empty("name", &[("val", "Calibri")])?;
        xml.empty("family", &[("val", "2")])?;
        xml.end("font")?;
    }
    xml.end("fonts")?;

    xml.start("fills", &[("count", "4")])?;
    for pattern in ["none", "gray125"] {
        xml.start("fill", &[])?;
        xml.empty("patternFill", &[("patternType", pattern)])?;
        xml.end("fill")?;
    }
    for color in [HEADER_FILL, CATEGORY_FILL] {
        xml.start("fill", &[])?;
        xml.start("patternFill", &[("patternType", "solid")])?;
        xml.empty("fgColor", &[("rgb", color)])?;
        xml.empty("bgColor", &[("indexed", "64")])?;
        xml.end("patternFill")?;
        xml.end("fill")?;
    }
    xml.end("fills")?;

    xml.start("borders", &[("count", "2")])?;
    xml.start("border", &[])?;
    for side in ["left", "right", "top", "bottom", "diagonal"] {
        xml.empty(side, &[])?;
    }
    xml.end("border")?;
    xml.start("border", &[])?;
    for side in ["left", "right", "top", "bottom"] {
        xml.start(side, &[("style", "thin")])?;
        xml.empty("color", &[("indexed", "64")])?;
        xml.end(side)?;
    }
    xml.empty("diagonal", &[])?;
    xml.end("border")?;
    xml.end("borders")?;

    xml.start("cellStyleXfs", &[("count", "1")])?;
    xml.empty("xf", &[("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")])?;
    xml.end("cellStyleXfs")?;

    xml.start("cellXfs", &[("count", &CellStyle::ALL.len().to_string())])?;
    for style in CellStyle::ALL {
        let spec = spec(style);
        let number_format = spec.number_format.to_string();
        let font = spec.font.to_string();
        let fill = spec.fill.to_string();
        let border = spec.border.to_string();
        let mut attributes = vec![
            ("numFmtId", number_format.as_str()),
            ("fontId", font.as_str()),
            ("fillId", fill.as_str()),
            ("borderId", border.as_str()),
            ("xfId", "0"),
        ];
        if spec.number_format != 0 {
            attributes.push(("applyNumberFormat", "1"));
        }
        if spec.font != FONT_DEFAULT {
            attributes.push(("applyFont", "1"));
        }
        if spec.fill != FILL_NONE {
            attributes.push(("applyFill", "1"));
        }
        if spec.border != BORDER_NONE {
            attributes.push(("applyBorder", "1"));
        }
        match spec.horizontal {
            Some(horizontal) => {
                attributes.push(("applyAlignment", "1"));
                xml.start("xf", &attributes)?;
                let mut alignment = vec![("horizontal", horizontal), ("vertical", "center")];
                if spec.wrap {
                    alignment.push(("wrapText", "1"));
                }
                xml.empty("alignment", &alignment)?;
                xml.end("xf")?;
            }
            None => xml.empty("xf", &attributes)?,
        }
    }
    xml.end("cellXfs")?;

    xml.start("cellStyles", &[("count", "1")])?;
    xml.empty("cellStyle", &[("name", "Normal"), ("xfId", "0"), ("builtinId", "0")])?;
    xml.end("cellStyles")?;

    xml.end("styleSheet")?;
    Ok(xml.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_category_fills_differ() {
        assert_eq!(spec(CellStyle::Header).fill, spec(CellStyle::Banner).fill);
        assert_ne!(spec(CellStyle::Header).fill, spec(CellStyle::Category).fill);
        assert_eq!(spec(CellStyle::Date).number_format, DATE_FORMAT_ID);
    }

    #[test]
    fn style_sheet_lists_one_xf_per_style() {
        let xml = String::from_utf8(write_styles().unwrap()).unwrap();
        assert!(xml.contains(&format!("<cellXfs count=\"{}\">", CellStyle::ALL.len())));
        assert!(xml.contains("formatCode=\"yyyy-mm-dd\""));
        assert!(xml.contains(HEADER_FILL));
        assert!(xml.contains(CATEGORY_FILL));
    }
}
