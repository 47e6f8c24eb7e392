use std::fmt::Write;

/// A numeric value handed to [`NumberFormat::write`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// A signed integer and the bit width of its source type.
    Int { value: i128, bits: u32 },
    UInt(u128),
    Float(f64),
}

impl Number {
    pub fn signed(value: i128, bits: u32) -> Self {
        Number::Int { value, bits }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int { value, .. } => value as f64,
            Number::UInt(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

/// A parsed numeric format string.
///
/// Standard specifiers are a single letter with an optional precision:
/// `F2`, `N0`, `D5`, `X8`, `x`, `E3`, `P1`, `G`. Custom patterns are built
/// from `0`, `#`, `,` and `.`, e.g. `0.00` or `#,##0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberFormat {
    General,
    Fixed(usize),
    Grouped(usize),
    Decimal(usize),
    Hex { upper: bool, width: usize },
    Exponent { upper: bool, precision: usize },
    Percent(usize),
    Custom {
        min_int: usize,
        min_frac: usize,
        max_frac: usize,
        grouping: bool,
    },
}

impl NumberFormat {
    pub fn parse(format: &str) -> Result<Self, String> {
        let format = format.trim();
        let mut chars = format.chars();
        let Some(first) = chars.next() else {
            return Ok(NumberFormat::General);
        };

        if first.is_ascii_alphabetic() {
            let rest = chars.as_str();
            let precision = if rest.is_empty() {
                None
            } else if rest.bytes().all(|b| b.is_ascii_digit()) && rest.len() <= 2 {
                rest.parse::<usize>().ok()
            } else {
                return Err(format!("invalid precision in `{format}`"));
            };
            return match first {
                'G' | 'g' => Ok(NumberFormat::General),
                'F' | 'f' => Ok(NumberFormat::Fixed(precision.unwrap_or(2))),
                'N' | 'n' => Ok(NumberFormat::Grouped(precision.unwrap_or(2))),
                'D' | 'd' => Ok(NumberFormat::Decimal(precision.unwrap_or(0))),
                'X' | 'x' => Ok(NumberFormat::Hex {
                    upper: first == 'X',
                    width: precision.unwrap_or(0),
                }),
                'E' | 'e' => Ok(NumberFormat::Exponent {
                    upper: first == 'E',
                    precision: precision.unwrap_or(6),
                }),
                'P' | 'p' => Ok(NumberFormat::Percent(precision.unwrap_or(2))),
                other => Err(format!("unknown format specifier `{other}`")),
            };
        }

        Self::parse_custom(format)
    }

    fn parse_custom(format: &str) -> Result<Self, String> {
        let (int_part, frac_part) = match format.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (format, ""),
        };
        let valid_int = int_part.chars().all(|c| matches!(c, '0' | '#' | ','));
        let valid_frac = frac_part.chars().all(|c| matches!(c, '0' | '#'));
        if !valid_int || !valid_frac || !int_part.contains(['0', '#']) {
            return Err(format!("invalid custom format `{format}`"));
        }
        let min_frac = frac_part.chars().take_while(|c| *c == '0').count();
        if frac_part.chars().skip(min_frac).any(|c| c == '0') {
            return Err(format!("invalid custom format `{format}`"));
        }
        Ok(NumberFormat::Custom {
            min_int: int_part.chars().filter(|c| *c == '0').count(),
            min_frac,
            max_frac: frac_part.len(),
            grouping: int_part.contains(','),
        })
    }

    pub fn write(&self, value: Number, out: &mut String) {
        match (*self, value) {
            (NumberFormat::General, _) => write_general(value, out),
            (NumberFormat::Fixed(precision), _) => write_fixed(value, precision, false, out),
            (NumberFormat::Grouped(precision), _) => write_fixed(value, precision, true, out),
            (NumberFormat::Decimal(width), Number::Int { value: v, .. }) => {
                if v < 0 {
                    out.push('-');
                }
                let _ = write!(out, "{:0width$}", v.unsigned_abs());
            }
            (NumberFormat::Decimal(width), Number::UInt(v)) => {
                let _ = write!(out, "{v:0width$}");
            }
            (NumberFormat::Hex { upper, width }, Number::Int { value, bits }) => {
                // two's complement at the width of the source type
                let mask = if bits >= u128::BITS { u128::MAX } else { (1 << bits) - 1 };
                write_hex(value as u128 & mask, upper, width, out);
            }
            (NumberFormat::Hex { upper, width }, Number::UInt(v)) => write_hex(v, upper, width, out),
            (NumberFormat::Decimal(_) | NumberFormat::Hex { .. }, Number::Float(_)) => {
                write_general(value, out)
            }
            (NumberFormat::Exponent { upper, precision }, _) => {
                write_exponent(value.as_f64(), upper, precision, out)
            }
            (NumberFormat::Percent(precision), _) => {
                write_fixed(Number::Float(value.as_f64() * 100.0), precision, true, out);
                out.push_str(" %");
            }
            (
                NumberFormat::Custom {
                    min_int,
                    min_frac,
                    max_frac,
                    grouping,
                },
                _,
            ) => write_custom(value.as_f64(), min_int, min_frac, max_frac, grouping, out),
        }
    }
}

fn write_general(value: Number, out: &mut String) {
    let _ = match value {
        Number::Int { value, .. } => write!(out, "{value}"),
        Number::UInt(v) => write!(out, "{v}"),
        Number::Float(v) => write!(out, "{v}"),
    };
}

fn write_fixed(value: Number, precision: usize, grouping: bool, out: &mut String) {
    let rendered = match value {
        Number::Int { value, .. } if precision == 0 => value.to_string(),
        Number::UInt(v) if precision == 0 => v.to_string(),
        Number::Int { value, .. } => format!("{value}.{:0<precision$}", ""),
        Number::UInt(v) => format!("{v}.{:0<precision$}", ""),
        Number::Float(v) if !v.is_finite() => v.to_string(),
        Number::Float(v) => format!("{v:.precision$}"),
    };
    if grouping {
        push_grouped(&rendered, out);
    } else {
        out.push_str(&rendered);
    }
}

fn write_hex(bits: u128, upper: bool, width: usize, out: &mut String) {
    let _ = if upper {
        write!(out, "{bits:0width$X}")
    } else {
        write!(out, "{bits:0width$x}")
    };
}

fn write_exponent(value: f64, upper: bool, precision: usize, out: &mut String) {
    if !value.is_finite() {
        let _ = write!(out, "{value}");
        return;
    }
    let rendered = format!("{value:.precision$e}");
    let (mantissa, exponent) = rendered.split_once('e').unwrap_or((rendered.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let _ = write!(
        out,
        "{mantissa}{}{sign}{:03}",
        if upper { 'E' } else { 'e' },
        exponent.unsigned_abs()
    );
}

fn write_custom(
    value: f64,
    min_int: usize,
    min_frac: usize,
    max_frac: usize,
    grouping: bool,
    out: &mut String,
) {
    if !value.is_finite() {
        let _ = write!(out, "{value}");
        return;
    }
    let rendered = format!("{:.max_frac$}", value.abs());
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
    let frac_part = {
        let trimmed = frac_part.trim_end_matches('0');
        if trimmed.len() < min_frac {
            &frac_part[..min_frac]
        } else {
            trimmed
        }
    };
    let int_part = if int_part == "0" && min_int == 0 { "" } else { int_part };

    let mut number = String::with_capacity(rendered.len() + 4);
    if int_part.len() < min_int {
        number.extend(std::iter::repeat_n('0', min_int - int_part.len()));
    }
    number.push_str(int_part);
    if !frac_part.is_empty() {
        number.push('.');
        number.push_str(frac_part);
    }
    if number.is_empty() {
        number.push('0');
    }

    let negative = value < 0.0 && number.bytes().any(|b| matches!(b, b'1'..=b'9'));
    if negative {
        out.push('-');
    }
    if grouping {
        push_grouped(&number, out);
    } else {
        out.push_str(&number);
    }
}

/// Append `number` with `,` inserted between thousands of its integer part.
fn push_grouped(number: &str, out: &mut String) {
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, rest) = match digits.find('.') {
        Some(dot) => digits.split_at(dot),
        None => (digits, ""),
    };
    out.push_str(sign);
    out.push_str(&group_thousands(int_part));
    out.push_str(rest);
}

pub(crate) fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
