use serde::{Deserialize, Serialize};

/// Longest IBAN any registry country allows.
pub const MAX_IBAN_LEN: usize = 34;

/// BBAN structure per country code (ISO 13616 registry). Each segment is
/// a length followed by its character class: `n` digits, `a` upper-case
/// letters, `c` upper-case alphanumerics. The full IBAN length is the sum
/// of the segments plus four.
#[rustfmt::skip]
const BBAN_FORMATS: &[(&str, &str)] = &[
    ("AD", "4n4n12c"), ("AE", "3n16n"), ("AL", "8n16c"), ("AT", "5n11n"),
    ("AZ", "4a20c"), ("BA", "3n3n8n2n"), ("BE", "3n7n2n"), ("BG", "4a4n2n8c"),
    ("BH", "4a14c"), ("BR", "8n5n10n1a1c"), ("BY", "4c4n16c"), ("CH", "5n12c"),
    ("CR", "4n14n"), ("CY", "3n5n16c"), ("CZ", "4n6n10n"), ("DE", "8n10n"),
    ("DK", "4n9n1n"), ("DO", "4c20n"), ("EE", "2n2n11n1n"), ("EG", "4n4n17n"),
    ("ES", "4n4n1n1n10n"), ("FI", "3n11n"), ("FO", "4n9n1n"),
    ("FR", "5n5n11c2n"), ("GB", "4a6n8n"), ("GE", "2a16n"), ("GI", "4a15c"),
    ("GL", "4n9n1n"), ("GR", "3n4n16c"), ("GT", "4c20c"), ("HR", "7n10n"),
    ("HU", "3n4n1n15n1n"), ("IE", "4a6n8n"), ("IL", "3n3n13n"),
    ("IQ", "4a3n12n"), ("IS", "4n2n6n10n"), ("IT", "1a5n5n12c"),
    ("JO", "4a4n18c"), ("KW", "4a22c"), ("KZ", "3n13c"), ("LB", "4n20c"),
    ("LC", "4a24c"), ("LI", "5n12c"), ("LT", "5n11n"), ("LU", "3n13c"),
    ("LV", "4a13c"), ("MC", "5n5n11c2n"), ("MD", "2c18c"), ("ME", "3n13n2n"),
    ("MK", "3n10c2n"), ("MR", "5n5n11n2n"), ("MT", "4a5n18c"),
    ("MU", "4a2n2n12n3n3a"), ("NL", "4a10n"), ("NO", "4n6n1n"), ("PK", "4a16c"),
    ("PL", "8n16n"), ("PS", "4a21c"), ("PT", "4n4n11n2n"), ("QA", "4a21c"),
    ("RO", "4a16c"), ("RS", "3n13n2n"), ("SA", "2n18c"), ("SC", "4a2n2n16n3a"),
    ("SE", "3n16n1n"), ("SI", "5n8n2n"), ("SK", "4n6n10n"), ("SM", "1a5n5n12c"),
    ("ST", "4n4n11n2n"), ("SV", "4a20n"), ("TL", "3n14n2n"),
    ("TN", "2n3n13n2n"), ("TR", "5n1n16c"), ("UA", "6n19c"), ("VA", "3n15n"),
    ("VG", "4a16n"), ("XK", "4n10n2n"),
];

/// How strictly IBAN input is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IbanMode {
    /// Country BBAN structure and mod-97 checksum (ISO 13616)
    #[default]
    Strict,
    /// Only requires a two-letter prefix; meant for manual testing
    Simple,
}

impl IbanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IbanMode::Strict => "strict",
            IbanMode::Simple => "simple",
        }
    }
}

/// State of an IBAN input field after the latest change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Empty,
    Valid,
    Invalid,
}

/// Result of feeding one keystroke's worth of input through the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbanInput {
    /// Grouped display form
    pub formatted: String,
    pub state: FieldState,
}

impl IbanInput {
    pub fn is_valid(&self) -> bool {
        self.state == FieldState::Valid
    }
}

fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Group an account identifier in blocks of four, upper-cased.
/// Example: "gb29nwbk60161331926819" -> "GB29 NWBK 6016 1331 9268 19"
pub fn format_iban(raw: &str) -> String {
    // Upper-case before grouping: some characters expand ("ß" -> "SS").
    let clean: Vec<char> = strip_whitespace(&raw.to_uppercase()).chars().collect();
    clean
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check an IBAN against its country's BBAN structure and the mod-97
/// checksum.
/// Whitespace and letter case are ignored.
pub fn validate_iban(raw: &str) -> bool {
    let iban = strip_whitespace(raw).to_uppercase();
    let bytes = iban.as_bytes();

    if bytes.len() < 5 || bytes.len() > MAX_IBAN_LEN {
        return false;
    }
    if !bytes[..2].iter().all(u8::is_ascii_uppercase)
        || !bytes[2..4].iter().all(u8::is_ascii_digit)
        || !bytes[4..].iter().all(u8::is_ascii_alphanumeric)
    {
        return false;
    }

    match BBAN_FORMATS.iter().find(|(code, _)| *code == &iban[..2]) {
        Some((_, format)) if bban_matches(format, &bytes[4..]) => {}
        _ => return false,
    }

    mod97(&iban) == 1
}

/// Walk the BBAN segment by segment. The BBAN must be consumed exactly.
fn bban_matches(format: &str, bban: &[u8]) -> bool {
    let mut pos = 0;
    let mut count = 0;
    for c in format.bytes() {
        if c.is_ascii_digit() {
            count = count * 10 + usize::from(c - b'0');
            continue;
        }
        let Some(segment) = bban.get(pos..pos + count) else {
            return false;
        };
        let class_ok = match c {
            b'n' => segment.iter().all(u8::is_ascii_digit),
            b'a' => segment.iter().all(u8::is_ascii_uppercase),
            b'c' => segment
                .iter()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()),
            _ => false,
        };
        if !class_ok {
            return false;
        }
        pos += count;
        count = 0;
    }
    pos == bban.len()
}

/// Rotate the first four characters to the end, expand letters to two
/// digits (A = 10) and reduce modulo 97 incrementally.
fn mod97(iban: &str) -> u32 {
    let (head, tail) = iban.split_at(4);
    tail.chars().chain(head.chars()).fold(0u32, |acc, c| match c.to_digit(36) {
        Some(v) if v >= 10 => (acc * 100 + v) % 97,
        Some(v) => (acc * 10 + v) % 97,
        None => acc,
    })
}

/// Accept anything whose first two characters are letters.
fn validate_simple(raw: &str) -> bool {
    let clean = strip_whitespace(raw).to_uppercase();
    let mut chars = clean.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(a), Some(b)) if a.is_ascii_uppercase() && b.is_ascii_uppercase()
    )
}

/// Validate and format raw field input under the given mode.
/// Validation always runs on the raw input, before grouping.
pub fn evaluate_iban(mode: IbanMode, raw: &str) -> IbanInput {
    let clean = strip_whitespace(raw).to_uppercase();
    if clean.is_empty() {
        return IbanInput {
            formatted: String::new(),
            state: FieldState::Empty,
        };
    }

    let (formatted, valid) = match mode {
        IbanMode::Strict => (format_iban(&clean), validate_iban(raw)),
        IbanMode::Simple => {
            if validate_simple(raw) {
                let truncated: String = clean.chars().take(MAX_IBAN_LEN).collect();
                (format_iban(&truncated), true)
            } else {
                (format_iban(&clean), false)
            }
        }
    };

    IbanInput {
        formatted,
        state: if valid {
            FieldState::Valid
        } else {
            FieldState::Invalid
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB_VALID: &str = "GB29NWBK60161331926819";

    #[test]
    fn test_format_groups_by_four() {
        assert_eq!(format_iban(GB_VALID), "GB29 NWBK 6016 1331 9268 19");
        assert_eq!(format_iban("gb29 nw bk6016"), "GB29 NWBK 6016");
        assert_eq!(format_iban(""), "");
        assert_eq!(format_iban("   "), "");
    }

    #[test]
    fn test_format_is_idempotent() {
        for input in [GB_VALID, "de89 3704 0044 0532 0130 00", "a b c", "x", "ÄbCdeFg", "ßabc"] {
            let once = format_iban(input);
            assert_eq!(format_iban(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_validate_known_ibans() {
        assert!(validate_iban(GB_VALID));
        assert!(validate_iban("GB29 NWBK 6016 1331 9268 19"));
        assert!(validate_iban("gb29nwbk60161331926819"));
        assert!(validate_iban("DE89370400440532013000"));
        assert!(validate_iban("FR1420041010050500013M02606"));
    }

    #[test]
    fn test_validate_rejects_altered_checksum() {
        assert!(!validate_iban("GB28NWBK60161331926819"));
        assert!(!validate_iban("GB29NWBK60161331926818"));
    }

    #[test]
    fn test_validate_rejects_bad_structure() {
        assert!(!validate_iban(""));
        assert!(!validate_iban("GB29"));
        assert!(!validate_iban("1229NWBK60161331926819"));
        assert!(!validate_iban("GBX9NWBK60161331926819"));
        assert!(!validate_iban("GB29NWBK6016133192681")); // wrong length for GB
        assert!(!validate_iban("ZZ29NWBK60161331926819")); // unknown country
        assert!(!validate_iban("GB29-NWBK-6016-1331-9268-19"));
    }

    #[test]
    fn test_validate_rejects_wrong_bban_structure() {
        // both pass mod-97 and have the GB length
        assert!(!validate_iban("GB321234ABCD1234567890")); // digit bank code
        assert!(!validate_iban("GB9612345678901234567X")); // letter in account number
        // DE is all digits
        assert!(!validate_iban("DE89370400440532013A00"));
    }

    #[test]
    fn test_bban_matches_segments() {
        assert!(bban_matches("4a6n8n", b"NWBK60161331926819"));
        assert!(bban_matches("5n5n11c2n", b"20041010050500013M02606"));
        assert!(!bban_matches("4a6n8n", b"NWBK6016133192681"));
        assert!(!bban_matches("4a6n8n", b"NWBK601613319268190"));
        assert!(!bban_matches("2n", b"1a"));
    }

    #[test]
    fn test_every_registered_format_is_well_formed() {
        for (code, format) in BBAN_FORMATS {
            let len: usize = format
                .split(|c: char| c.is_ascii_alphabetic())
                .filter(|n| !n.is_empty())
                .map(|n| n.parse::<usize>().unwrap())
                .sum();
            assert!(len + 4 <= MAX_IBAN_LEN, "{code}");
            assert!(format.ends_with(['n', 'a', 'c']), "{code}");
        }
    }

    #[test]
    fn test_evaluate_strict() {
        let input = evaluate_iban(IbanMode::Strict, "gb29nwbk60161331926819");
        assert_eq!(input.formatted, "GB29 NWBK 6016 1331 9268 19");
        assert!(input.is_valid());

        let input = evaluate_iban(IbanMode::Strict, "GB29NWBK");
        assert_eq!(input.formatted, "GB29 NWBK");
        assert_eq!(input.state, FieldState::Invalid);

        assert_eq!(evaluate_iban(IbanMode::Strict, " ").state, FieldState::Empty);
    }

    #[test]
    fn test_evaluate_simple_accepts_letter_prefix() {
        let input = evaluate_iban(IbanMode::Simple, "xx12 3");
        assert!(input.is_valid());
        assert_eq!(input.formatted, "XX12 3");

        let input = evaluate_iban(IbanMode::Simple, "1X123");
        assert_eq!(input.state, FieldState::Invalid);
    }

    #[test]
    fn test_evaluate_simple_truncates_to_max_len() {
        let long = format!("AB{}", "1".repeat(40));
        let input = evaluate_iban(IbanMode::Simple, &long);
        assert!(input.is_valid());
        assert_eq!(input.formatted.replace(' ', "").len(), MAX_IBAN_LEN);
    }

    #[test]
    fn test_default_mode_is_strict() {
        assert_eq!(IbanMode::default(), IbanMode::Strict);
    }
}
