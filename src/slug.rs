use crate::constants::{SLUG_FALLBACK, SLUG_MAX_LEN};
use std::collections::HashSet;

/// URL slug for an organization name: `"Hill Top Farms, LLC"` → `"hill-top-farms-llc"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= SLUG_MAX_LEN {
            break;
        }
    }
    slug.truncate(SLUG_MAX_LEN);
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        slug
    }
}

/// First of `base`, `base-2`, `base-3`, ... not already taken.
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugifies_names() {
        assert_eq!(slugify("Hill Top Farms, LLC"), "hill-top-farms-llc");
        assert_eq!(slugify("  --Pigs & Co--  "), "pigs-co");
        assert_eq!(slugify("Ferme Élevage"), "ferme-levage");
        assert_eq!(slugify("!!!"), "farm");
        assert!(slugify(&"long name ".repeat(20)).len() <= SLUG_MAX_LEN);
    }

    #[test]
    fn suffixes_taken_slugs() {
        let taken: HashSet<String> = ["acres".to_string(), "acres-2".to_string()].into_iter().collect();
        assert_eq!(unique_slug("acres", &taken), "acres-3");
        assert_eq!(unique_slug("meadow", &taken), "meadow");
    }
}
