/// Sub-fields of an OpenPGP User ID packet.
///
/// A User ID is conventionally `Name (Comment) <email>`; any of the three
/// parts may be absent. Malformed strings degrade to empty sub-fields,
/// which the validator then rejects against the claimed account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub comment: String,
    pub email: String,
}

/// Split a raw User ID string into its conventional sub-fields.
pub fn parse_user_id(raw: &str) -> Identity {
    let open_angle = raw.find('<');
    let open_paren = raw.find('(');

    let email = open_angle
        .and_then(|i| raw[i + 1..].find('>').map(|j| &raw[i + 1..i + 1 + j]))
        .unwrap_or("");
    let comment = open_paren
        .and_then(|i| raw[i + 1..].find(')').map(|j| &raw[i + 1..i + 1 + j]))
        .unwrap_or("");
    let name_end = [open_paren, open_angle]
        .iter()
        .flatten()
        .copied()
        .min()
        .unwrap_or(raw.len());

    Identity {
        name: raw[..name_end].trim().to_string(),
        comment: comment.trim().to_string(),
        email: email.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_email() {
        let id = parse_user_id("<alice@yahoo.com>");
        assert_eq!(id.name, "");
        assert_eq!(id.comment, "");
        assert_eq!(id.email, "alice@yahoo.com");
    }

    #[test]
    fn name_and_email() {
        let id = parse_user_id("Alice Example <alice@yahoo.com>");
        assert_eq!(id.name, "Alice Example");
        assert_eq!(id.comment, "");
        assert_eq!(id.email, "alice@yahoo.com");
    }

    #[test]
    fn name_comment_and_email() {
        let id = parse_user_id("Alice (work) <alice@yahoo.com>");
        assert_eq!(id.name, "Alice");
        assert_eq!(id.comment, "work");
        assert_eq!(id.email, "alice@yahoo.com");
    }

    #[test]
    fn comment_only_with_email() {
        let id = parse_user_id("(work) <alice@yahoo.com>");
        assert_eq!(id.name, "");
        assert_eq!(id.comment, "work");
        assert_eq!(id.email, "alice@yahoo.com");
    }

    #[test]
    fn no_email_brackets() {
        let id = parse_user_id("alice@yahoo.com");
        assert_eq!(id.name, "alice@yahoo.com");
        assert_eq!(id.email, "");
    }

    #[test]
    fn empty_string() {
        assert_eq!(parse_user_id(""), Identity::default());
    }

    #[test]
    fn unterminated_email_bracket_yields_no_email() {
        let id = parse_user_id("<alice@yahoo.com");
        assert_eq!(id.email, "");
    }
}
