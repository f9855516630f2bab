//! User search and pagination helpers.

use crate::error::BusinessErrorCode;
use crate::keycloak::UserRepresentation;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_no: u32,
    pub limit: u32,
}

impl Pagination {
    /// Page number and limit are required together.
    ///
    /// Neither given means "no paging"; exactly one, or a zero, is rejected.
    pub fn from_params(
        page_no: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Option<Self>, BusinessErrorCode> {
        match (page_no, limit) {
            (None, None) => Ok(None),
            (Some(page_no), Some(limit)) if page_no > 0 && limit > 0 => {
                Ok(Some(Self { page_no, limit }))
            }
            _ => Err(BusinessErrorCode::MissingPaginationParameters),
        }
    }

    /// Like [`from_params`](Self::from_params), but paging is mandatory.
    pub fn required(page_no: Option<u32>, limit: Option<u32>) -> Result<Self, BusinessErrorCode> {
        Self::from_params(page_no, limit)?.ok_or(BusinessErrorCode::MissingPaginationParameters)
    }

    /// Zero-based index of the first item.
    pub fn first(&self) -> u32 {
        (self.page_no - 1).saturating_mul(self.limit)
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.first() as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Case-insensitive match against username, first name, last name or email.
pub fn search_users(users: Vec<UserRepresentation>, search: &str) -> Vec<UserRepresentation> {
    let needle = search.to_lowercase();
    users
        .into_iter()
        .filter(|user| {
            [
                Some(user.username.as_str()),
                user.first_name.as_deref(),
                user.last_name.as_deref(),
                user.email.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_requires_both_params() {
        assert_eq!(Pagination::from_params(None, None), Ok(None));
        assert_eq!(
            Pagination::from_params(Some(2), Some(10)),
            Ok(Some(Pagination { page_no: 2, limit: 10 }))
        );
        assert_eq!(
            Pagination::from_params(Some(1), None),
            Err(BusinessErrorCode::MissingPaginationParameters)
        );
        assert_eq!(
            Pagination::from_params(None, Some(5)),
            Err(BusinessErrorCode::MissingPaginationParameters)
        );
        assert_eq!(
            Pagination::from_params(Some(0), Some(5)),
            Err(BusinessErrorCode::MissingPaginationParameters)
        );
        assert!(Pagination::required(None, None).is_err());
    }

    #[test]
    fn test_apply_pages() {
        let page = Pagination { page_no: 2, limit: 3 };
        assert_eq!(page.first(), 3);
        assert_eq!(page.apply((1..=8).collect()), vec![4, 5, 6]);

        let past_end = Pagination { page_no: 4, limit: 3 };
        assert!(past_end.apply((1..=8).collect::<Vec<i32>>()).is_empty());
    }

    #[test]
    fn test_search_users() {
        let users = vec![
            UserRepresentation {
                id: "1".into(),
                username: "jdoe".into(),
                email: Some("jane@example.com".into()),
                ..Default::default()
            },
            UserRepresentation {
                id: "2".into(),
                username: "bob".into(),
                first_name: Some("Robert".into()),
                ..Default::default()
            },
        ];

        let found = search_users(users.clone(), "JANE");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
        assert_eq!(search_users(users, "rob")[0].id, "2");
    }
}
