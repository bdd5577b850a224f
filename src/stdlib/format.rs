//! printf-style rendering shared by `string.format` and `float.toString`.

use crate::value::{NativeError, Value};

#[derive(Debug, Default, Clone, Copy)]
struct Directive {
    left: bool,
    plus: bool,
    space: bool,
    alt: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
}

/// Expands `fmt` against `args`. Each conversion consumes one argument whose
/// type must match the conversion exactly.
pub(super) fn sprintf(fmt: &str, args: &[Value]) -> Result<String, NativeError> {
    let mut out = String::new();
    let mut args = args.iter();
    let mut chars = fmt.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.left = true,
                '+' => directive.plus = true,
                ' ' => directive.space = true,
                '#' => directive.alt = true,
                '0' => directive.zero = true,
                _ => break,
            }
            chars.next();
        }
        directive.width = take_number(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            directive.precision = Some(take_number(&mut chars));
        }
        match chars.peek() {
            Some(&modifier) if modifier == 'h' || modifier == 'l' => {
                chars.next();
                if chars.peek() == Some(&modifier) {
                    chars.next();
                }
            }
            Some('z' | 'j' | 't') => {
                chars.next();
            }
            _ => {}
        }

        let conv = chars
            .next()
            .ok_or_else(|| NativeError::message("string.format invalid format"))?;
        let arg = args
            .next()
            .ok_or_else(|| NativeError::message("string.format missing argument"))?;
        out.push_str(&convert(conv, directive, arg)?);
    }
    Ok(out)
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> usize {
    let mut value = 0usize;
    while let Some(digit) = chars.peek().and_then(|ch| ch.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(digit as usize);
        chars.next();
    }
    value
}

fn convert(conv: char, directive: Directive, arg: &Value) -> Result<String, NativeError> {
    let expected = |kind: &str| NativeError::message(format!("string.format expected {kind}"));
    match conv {
        'd' | 'i' => {
            let Value::Int(n) = arg else {
                return Err(expected("int"));
            };
            Ok(integer(directive, n.is_negative(), n.unsigned_abs(), 10, false, ""))
        }
        'u' | 'x' | 'X' | 'o' => {
            let Value::Int(n) = arg else {
                return Err(expected("int"));
            };
            let bits = *n as u64;
            let (radix, prefix) = match conv {
                'u' => (10, ""),
                'x' => (16, if directive.alt && bits != 0 { "0x" } else { "" }),
                'X' => (16, if directive.alt && bits != 0 { "0X" } else { "" }),
                _ => (8, ""),
            };
            let unsigned = Directive {
                plus: false,
                space: false,
                ..directive
            };
            Ok(integer(unsigned, false, bits, radix, conv == 'X', prefix))
        }
        'c' => {
            let Value::Int(n) = arg else {
                return Err(expected("int"));
            };
            let ch = char::from(*n as u8);
            Ok(pad(directive, "", &ch.to_string(), false))
        }
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
            let Value::Float(n) = arg else {
                return Err(expected("float"));
            };
            Ok(float(directive, conv, *n))
        }
        's' => {
            let Value::String(s) = arg else {
                return Err(expected("string"));
            };
            let text = match directive.precision {
                Some(limit) => truncate(s, limit),
                None => &**s,
            };
            Ok(pad(directive, "", text, false))
        }
        _ => Err(NativeError::message("string.format unsupported directive")),
    }
}

fn truncate(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn sign(directive: Directive, negative: bool) -> &'static str {
    if negative {
        "-"
    } else if directive.plus {
        "+"
    } else if directive.space {
        " "
    } else {
        ""
    }
}

fn integer(
    directive: Directive,
    negative: bool,
    magnitude: u64,
    radix: u32,
    upper: bool,
    prefix: &str,
) -> String {
    let mut digits = match (radix, upper) {
        (16, true) => format!("{magnitude:X}"),
        (16, false) => format!("{magnitude:x}"),
        (8, _) => format!("{magnitude:o}"),
        _ => magnitude.to_string(),
    };
    match directive.precision {
        Some(0) if magnitude == 0 => digits.clear(),
        Some(min) if digits.len() < min => {
            digits = format!("{}{digits}", "0".repeat(min - digits.len()));
        }
        _ => {}
    }
    if radix == 8 && directive.alt && !digits.starts_with('0') {
        digits.insert(0, '0');
    }
    let head = format!("{}{prefix}", sign(directive, negative));
    pad(directive, &head, &digits, directive.precision.is_none())
}

/// Applies the field width. Zero padding goes between `head` (sign and
/// radix prefix) and `body`.
fn pad(directive: Directive, head: &str, body: &str, zero_allowed: bool) -> String {
    let len = head.chars().count() + body.chars().count();
    if len >= directive.width {
        return format!("{head}{body}");
    }
    let fill = directive.width - len;
    if directive.left {
        format!("{head}{body}{}", " ".repeat(fill))
    } else if directive.zero && zero_allowed {
        format!("{head}{}{body}", "0".repeat(fill))
    } else {
        format!("{}{head}{body}", " ".repeat(fill))
    }
}

fn float(directive: Directive, conv: char, value: f64) -> String {
    let upper = conv.is_ascii_uppercase();
    let head = sign(directive, value.is_sign_negative() && !value.is_nan());
    if !value.is_finite() {
        let body = match (value.is_nan(), upper) {
            (true, false) => "nan",
            (true, true) => "NAN",
            (false, false) => "inf",
            (false, true) => "INF",
        };
        return pad(directive, head, body, false);
    }
    let magnitude = value.abs();
    let precision = directive.precision.unwrap_or(6);
    let body = match conv.to_ascii_lowercase() {
        'f' => fixed(magnitude, precision, directive.alt),
        'e' => exponential(magnitude, precision, directive.alt, upper),
        _ => general(magnitude, precision, directive.alt, upper),
    };
    pad(directive, head, &body, true)
}

fn fixed(magnitude: f64, precision: usize, alt: bool) -> String {
    let mut body = format!("{magnitude:.precision$}");
    if alt && precision == 0 {
        body.push('.');
    }
    body
}

fn exponential(magnitude: f64, precision: usize, alt: bool, upper: bool) -> String {
    let rendered = format!("{magnitude:.precision$e}");
    let (mantissa, exponent) = rendered.split_once('e').unwrap_or((&rendered, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let mut body = mantissa.to_string();
    if alt && precision == 0 {
        body.push('.');
    }
    let marker = if upper { 'E' } else { 'e' };
    let exp_sign = if exponent < 0 { '-' } else { '+' };
    format!("{body}{marker}{exp_sign}{:02}", exponent.unsigned_abs())
}

/// `%g`: shortest of fixed and exponential for the given significant digits.
pub(super) fn general(magnitude: f64, precision: usize, alt: bool, upper: bool) -> String {
    let precision = precision.max(1);
    let scientific = format!("{magnitude:.prec$e}", prec = precision - 1);
    let exponent: i64 = scientific
        .split_once('e')
        .and_then(|(_, exp)| exp.parse().ok())
        .unwrap_or(0);
    let mut body = if exponent < -4 || exponent >= precision as i64 {
        exponential(magnitude, precision - 1, alt, upper)
    } else {
        let decimals = (precision as i64 - 1 - exponent) as usize;
        fixed(magnitude, decimals, alt)
    };
    if !alt {
        body = strip_trailing_zeros(&body);
    }
    body
}

fn strip_trailing_zeros(body: &str) -> String {
    let (number, suffix) = match body.find(|ch| ch == 'e' || ch == 'E') {
        Some(idx) => body.split_at(idx),
        None => (body, ""),
    };
    if !number.contains('.') {
        return body.to_string();
    }
    let trimmed = number.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}{suffix}")
}
