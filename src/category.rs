//! Expense categories, either user-created or shared built-ins.
//!
//! Shared categories carry the [SHARED_OWNER] sentinel as their owner and
//! are visible to every user, but only user-created categories can be
//! edited or deleted.

use std::fmt::Display;

use serde_json::{Value, json};

use crate::{
    Error, SaveOutcome,
    session::{Session, UserId},
    stores::{Document, DocumentId, DocumentStore, Fields, SHARED_OWNER, collections},
};

/// The name of an expense category, e.g. "Alimentação".
///
/// To create a new `CategoryName`, use [CategoryName::new].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// The name is stored as given, whitespace included.
    ///
    /// # Errors
    ///
    /// Returns an [Error::EmptyCategoryName] if `name` is empty or blank.
    pub fn new(name: &str) -> Result<Self, Error> {
        if name.trim().is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validating it.
    ///
    /// Intended for values read back from the store, which were validated
    /// when they were written.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }

    /// The name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who owns a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOwner {
    /// A category created by, and private to, one user.
    User(UserId),
    /// A built-in category shared with every user.
    Shared,
}

/// An expense category.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseCategory {
    /// The ID of the stored document.
    pub id: DocumentId,
    /// Who owns this category.
    pub owner: CategoryOwner,
    /// The category name.
    pub name: CategoryName,
}

impl ExpenseCategory {
    /// Decode a stored document.
    pub fn from_document(document: &Document) -> Self {
        let owner = match document.owner() {
            Some(owner) if owner == SHARED_OWNER => CategoryOwner::Shared,
            other => CategoryOwner::User(UserId::new(other.unwrap_or_default())),
        };

        Self {
            id: document.id.clone(),
            owner,
            name: CategoryName::new_unchecked(
                document
                    .field("nome")
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            ),
        }
    }

    /// Whether this category is a shared built-in.
    pub fn is_shared(&self) -> bool {
        self.owner == CategoryOwner::Shared
    }
}

/// Decode every document in a snapshot.
pub fn categories_from_snapshot(snapshot: &[Document]) -> Vec<ExpenseCategory> {
    snapshot.iter().map(ExpenseCategory::from_document).collect()
}

/// Save the category form.
///
/// Pass `editing` to rename an existing category. A blank name means the
/// form is incomplete, so nothing is written and the save reports
/// [SaveOutcome::Skipped].
///
/// # Errors
///
/// This function will return a:
/// - [Error::SharedCategoryProtected] if `editing` is a shared built-in,
/// - [Error::DocumentNotFound] if `editing` no longer refers to a stored
///   category,
/// - or [Error::SqlError] if there is some other store error.
pub fn save_category<S: DocumentStore>(
    store: &S,
    session: &Session,
    name: &str,
    editing: Option<&ExpenseCategory>,
) -> Result<SaveOutcome, Error> {
    let Ok(name) = CategoryName::new(name) else {
        return Ok(SaveOutcome::Skipped);
    };

    match editing {
        Some(category) => {
            if category.is_shared() {
                return Err(Error::SharedCategoryProtected);
            }

            let fields = Fields::from_iter([("nome".to_string(), json!(name.as_str()))]);
            store.update(collections::EXPENSE_CATEGORIES, &category.id, fields)?;

            Ok(SaveOutcome::Updated)
        }
        None => {
            let fields = Fields::from_iter([
                ("nome".to_string(), json!(name.as_str())),
                ("uid".to_string(), json!(session.user_id.as_str())),
            ]);
            let id = store.insert(collections::EXPENSE_CATEGORIES, fields)?;

            Ok(SaveOutcome::Created(id))
        }
    }
}

/// Delete a user-created category.
///
/// # Errors
///
/// This function will return a:
/// - [Error::SharedCategoryProtected] if the category is a shared built-in,
/// - or [Error::SqlError] if the delete could not be executed.
pub fn delete_category<S: DocumentStore>(
    store: &S,
    category: &ExpenseCategory,
) -> Result<(), Error> {
    if category.is_shared() {
        return Err(Error::SharedCategoryProtected);
    }

    store.delete(collections::EXPENSE_CATEGORIES, &category.id)
}

#[cfg(test)]
mod category_name_tests {
    use crate::Error;

    use super::CategoryName;

    #[test]
    fn accepts_non_blank_names() {
        let name = CategoryName::new("Alimentação").unwrap();

        assert_eq!(name.as_str(), "Alimentação");
    }

    #[test]
    fn rejects_blank_names() {
        assert_eq!(CategoryName::new(""), Err(Error::EmptyCategoryName));
        assert_eq!(CategoryName::new("   "), Err(Error::EmptyCategoryName));
    }
}
