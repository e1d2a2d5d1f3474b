use chrono::Duration;
use chrono::NaiveDate;

/// How a numeric cell should be interpreted, derived from its number format.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Number,
    /// Date/time values stored as serial day numbers
    DateTime,
    /// Date values stored as serial day numbers
    Date,
    /// Time values stored as day fractions
    Time,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str) -> Option<Self> {
        match id {
            "22" => Some(Self::DateTime),
            "14" | "15" | "16" | "17" => Some(Self::Date),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::Time),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns.
    pub(crate) fn parse_custom_number_format(format: &str) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time) {
            (true, true) => Self::DateTime,
            (true, false) => Self::Date,
            (false, true) => Self::Time,
            _ => Self::Number,
        }
    }

    /// True when the integral part of the value is a day number.
    pub(crate) fn is_date(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }
}

/// Number format code written for date cells.
pub(crate) const DATE_FORMAT_CODE: &str = "yyyy-mm-dd";

/// Custom number format id of [`DATE_FORMAT_CODE`] in written workbooks.
pub(crate) const DATE_FORMAT_ID: u32 = 164;

/// Serial day number of 9999-12-31, the last date a workbook can hold.
pub(crate) const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// Converts a serial day number to a calendar date.
/// Handles the Lotus 1-2-3 leap year bug of the 1900 date system.
pub(crate) fn serial_to_date(serial: f64, is_1904: bool) -> Option<NaiveDate> {
    if !(0.0..=MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::try_days(days + offset)?)
}

/// Converts a calendar date to a 1900-system serial day number.
pub(crate) fn date_to_serial(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).expect("NaiveDate Literal");
    let days = (date - epoch).num_days();
    // Serials below 61 sit before the phantom 1900-02-29
    if days < 61 {
        (days - 1) as f64
    } else {
        days as f64
    }
}

/// True when `date` falls on a serial a workbook can hold (1900-01-01 to 9999-12-31).
pub(crate) fn has_date_serial(date: NaiveDate) -> bool {
    (1.0..=MAX_DATE_SERIAL).contains(&date_to_serial(date))
}

/// True for the error literals a formula cell can evaluate to.
pub(crate) fn is_error_literal(value: &str) -> bool {
    matches!(
        value,
        "#NULL!" | "#DIV/0!" | "#VALUE!" | "#REF!" | "#NAME?" | "#NUM!" | "#N/A" | "#GETTING_DATA"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn builtin_formats() {
        assert_eq!(CellType::parse_builtin_number_format_id("14"), Some(CellType::Date));
        assert_eq!(CellType::parse_builtin_number_format_id("22"), Some(CellType::DateTime));
        assert_eq!(CellType::parse_builtin_number_format_id("20"), Some(CellType::Time));
        assert_eq!(CellType::parse_builtin_number_format_id("0"), None);
    }

    #[test]
    fn custom_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd"), CellType::Date);
        assert_eq!(CellType::parse_custom_number_format("dd/mm/yyyy hh:mm"), CellType::DateTime);
        assert_eq!(CellType::parse_custom_number_format("[h]:mm"), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("hh:mm"), CellType::Time);
        assert_eq!(CellType::parse_custom_number_format("\"days\" 0"), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00"), CellType::Number);
    }

    #[test]
    fn serials_round_trip() {
        for value in [date(2024, 1, 1), date(1900, 3, 1), date(1999, 12, 31), date(1900, 1, 1)] {
            assert_eq!(serial_to_date(date_to_serial(value), false), Some(value));
        }
        assert_eq!(date_to_serial(date(2024, 1, 1)), 45292.0);
        assert_eq!(date_to_serial(date(1900, 1, 1)), 1.0);
    }

    #[test]
    fn serial_range_bounds() {
        assert!(has_date_serial(date(1900, 1, 1)));
        assert!(has_date_serial(date(9999, 12, 31)));
        assert!(!has_date_serial(date(1899, 12, 31)));
        assert!(!has_date_serial(date(1899, 6, 1)));
        assert!(!has_date_serial(date(10000, 1, 1)));
    }

    #[test]
    fn serial_1904_system() {
        assert_eq!(serial_to_date(0.0, true), Some(date(1904, 1, 1)));
        assert_eq!(serial_to_date(43830.5, true), Some(date(2024, 1, 1)));
    }

    #[test]
    fn out_of_range_serials_are_rejected() {
        assert_eq!(serial_to_date(-1.0, false), None);
        assert_eq!(serial_to_date(f64::NAN, false), None);
        assert_eq!(serial_to_date(f64::INFINITY, false), None);
        assert_eq!(serial_to_date(1e20, false), None);
        assert_eq!(serial_to_date(MAX_DATE_SERIAL + 1.0, false), None);
        assert_eq!(serial_to_date(MAX_DATE_SERIAL, false), Some(date(9999, 12, 31)));
    }
}
