/// Free-text numeric field.
///
/// Holds whatever the user typed; the committed value lives elsewhere and
/// is only touched when the text parses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NumericInput {
    text: String,
}

impl NumericInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Leading decimal number of the text, if any
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        parse_float_prefix(&self.text)
    }

    /// Leading integer of the text, if any
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        parse_int_prefix(&self.text)
    }
}

fn sign_len(s: &str) -> usize {
    usize::from(s.starts_with(['+', '-']))
}

fn digits_len(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// Parse the longest numeric prefix, ignoring leading whitespace, so
/// "150%" reads as 150 and "abc" as nothing.
#[must_use]
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let mut end = sign_len(s);
    let int_digits = digits_len(&s[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if s[end..].starts_with('.') {
        frac_digits = digits_len(&s[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    // optional exponent, only if digits follow it
    if s[end..].starts_with(['e', 'E']) {
        let exp_sign = sign_len(&s[end + 1..]);
        let exp_digits = digits_len(&s[end + 1 + exp_sign..]);
        if exp_digits > 0 {
            end += 1 + exp_sign + exp_digits;
        }
    }

    s[..end].parse().ok().filter(|v: &f64| v.is_finite())
}

#[must_use]
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let end = sign_len(s) + digits_len(&s[sign_len(s)..]);
    if end == sign_len(s) {
        return None;
    }
    s[..end].parse().ok()
}
