//! Brazilian company tax id (CNPJ) normalization and check digits.

pub const CNPJ_LENGTH: usize = 14;

pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validates both mod-11 check digits of a CNPJ. Punctuation is ignored.
pub fn is_valid_cnpj(raw: &str) -> bool {
    let digits: Vec<u32> = normalize(raw)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != CNPJ_LENGTH || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let d1 = check_digit(&digits[..12], 5);
    let d2 = check_digit(&digits[..13], 6);
    digits[12] == d1 && digits[13] == d2
}

fn check_digit(base: &[u32], first_weight: u32) -> u32 {
    let mut weight = first_weight;
    let mut sum = 0;
    for digit in base {
        sum += digit * weight;
        weight = if weight == 2 { 9 } else { weight - 1 };
    }
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}
