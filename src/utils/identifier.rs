/// Check the shape of an ORCID iD: four groups of four digits separated by
/// hyphens, the last character may be the checksum `X`.
///
/// The ISO 7064 checksum is verified as well.
///
/// # Examples
/// ```
/// use pubregistry::utils::is_valid_orcid;
///
/// assert!(is_valid_orcid("0000-0002-1825-0097"));
/// assert!(!is_valid_orcid("0000-0002-1825-0098"));
/// assert!(!is_valid_orcid("invalid-orcid"));
/// ```
pub fn is_valid_orcid(orcid: &str) -> bool {
    let bytes = orcid.as_bytes();
    if bytes.len() != 19 {
        return false;
    }

    let mut digits = Vec::with_capacity(16);
    for (i, &b) in bytes.iter().enumerate() {
        match i {
            4 | 9 | 14 => {
                if b != b'-' {
                    return false;
                }
            }
            18 if b == b'X' => digits.push(10),
            _ if b.is_ascii_digit() => digits.push(u32::from(b - b'0')),
            _ => return false,
        }
    }

    let (body, check) = digits.split_at(15);
    let total = body.iter().fold(0, |acc, d| (acc + d) * 2);
    let expected = (12 - total % 11) % 11;

    check[0] == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_orcids() {
        assert!(is_valid_orcid("0000-0002-1825-0097"));
        assert!(is_valid_orcid("0000-0001-5109-3700"));
        assert!(is_valid_orcid("0000-0002-1694-233X"));
    }

    #[test]
    fn test_bad_checksum() {
        assert!(!is_valid_orcid("0000-0002-1694-2330"));
    }

    #[test]
    fn test_bad_shape() {
        assert!(!is_valid_orcid("0000000218250097"));
        assert!(!is_valid_orcid("0000-0002-1825-009"));
        assert!(!is_valid_orcid("0000-0002-1825-X097"));
        assert!(!is_valid_orcid("0000_0002_1825_0097"));
    }
}
