use super::MinorUnits;

/// A row of the `accounts` relation: the current state of one named account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub name: String,
    pub balance: MinorUnits,
}

impl AccountRecord {
    pub fn new(name: impl Into<String>, balance: MinorUnits) -> Self {
        Self {
            name: name.into(),
            balance,
        }
    }
}

/// Account names are primary keys and must carry at least one visible character.
pub fn is_valid_account_name(name: &str) -> bool {
    !name.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_names_are_invalid() {
        assert!(!is_valid_account_name(""));
        assert!(!is_valid_account_name("   "));
        assert!(!is_valid_account_name("\t\n"));
    }

    #[test]
    fn test_regular_names_are_valid() {
        assert!(is_valid_account_name("Tom"));
        assert!(is_valid_account_name(" Eric "));
        assert!(is_valid_account_name("TerryG"));
    }
}
