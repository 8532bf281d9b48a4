use url::form_urlencoded;

/// Brazilian country code prepended to local numbers
const COUNTRY_CODE: &str = "55";

/// Builds a WhatsApp deep link (`wa.me`) for contacting a seller.
///
/// Accepts numbers with any formatting; keeps digits only. Local
/// numbers (10-11 digits, area code + subscriber) get the country code
/// prepended. Returns `None` when no plausible number remains.
pub fn contact_link(number: &str, message: &str) -> Option<String> {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < 10 || digits.len() > 15 {
        return None;
    }

    let full = if digits.len() <= 11 {
        format!("{}{}", COUNTRY_CODE, digits)
    } else {
        digits
    };

    if message.is_empty() {
        return Some(format!("https://wa.me/{}", full));
    }

    let encoded: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();

    Some(format!("https://wa.me/{}?text={}", full, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_number_gets_country_code() {
        let link = contact_link("(11) 98765-4321", "").unwrap();
        assert_eq!(link, "https://wa.me/5511987654321");
    }

    #[test]
    fn test_international_number_kept() {
        let link = contact_link("+55 11 98765-4321", "").unwrap();
        assert_eq!(link, "https://wa.me/5511987654321");
    }

    #[test]
    fn test_message_is_urlencoded() {
        let link = contact_link("11987654321", "Olá! Vi seu anúncio").unwrap();
        assert!(link.starts_with("https://wa.me/5511987654321?text="));
        assert!(!link.contains(' '));
        assert!(link.contains("text=Ol%C3%A1%21+Vi+seu+an%C3%BAncio"));
    }

    #[test]
    fn test_too_short_number_rejected() {
        assert!(contact_link("12345", "hi").is_none());
        assert!(contact_link("no digits here", "hi").is_none());
    }
}
