//! Raw log records and field extraction
//!
//! Log records are loosely structured: any field may be missing, blank or of
//! the wrong JSON type. [`RawRecord`] keeps every field optional, with
//! mistyped values read as absent, and the `extract*` methods turn it into
//! typed data or a named [`ExtractError`].
//!
//! Example record:
//! ```json
//! {
//!   "Type": "BORROW",
//!   "ActionDateTime": "2024-01-01T10:00:00Z",
//!   "Customer": {"Passport": "P1", "FirstName": "Ann", "LastName": "Lee"},
//!   "Book": {
//!     "LibraryCallNumber": "C1",
//!     "Literary Creation": {"UniqueID": "U1", "Title": "T1", "Author": {"Name": "A"}}
//!   }
//! }
//! ```

use crate::error::ExtractError;
use crate::timestamp::parse_timestamp;
use chrono::{DateTime, Utc};
use crazylib_common::EventKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One log record as found in the input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,

    #[serde(rename = "ActionDateTime", default, deserialize_with = "lenient")]
    pub action_date_time: Option<String>,

    #[serde(rename = "Customer", default, deserialize_with = "lenient_block")]
    pub customer: Option<RawCustomer>,

    #[serde(rename = "Book", default, deserialize_with = "lenient_block")]
    pub book: Option<RawBook>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCustomer {
    #[serde(rename = "Passport", default, deserialize_with = "lenient")]
    pub passport: Option<String>,
    #[serde(rename = "FirstName", default, deserialize_with = "lenient")]
    pub first_name: Option<String>,
    #[serde(rename = "LastName", default, deserialize_with = "lenient")]
    pub last_name: Option<String>,
    #[serde(rename = "PhoneNumber", default, deserialize_with = "lenient")]
    pub phone: Option<String>,
    #[serde(rename = "Email", default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(rename = "BirthDate", default, deserialize_with = "lenient")]
    pub birth_date: Option<String>,
    #[serde(rename = "Address", default, deserialize_with = "lenient")]
    pub address: Option<String>,
    #[serde(rename = "City", default, deserialize_with = "lenient")]
    pub city: Option<String>,
    #[serde(rename = "Zip", default, deserialize_with = "lenient")]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBook {
    #[serde(rename = "LibraryCallNumber", default, deserialize_with = "lenient")]
    pub call_number: Option<String>,

    /// Legacy spelling, checked first
    #[serde(rename = "Literary Creation", default, deserialize_with = "lenient_block")]
    pub literary_creation_legacy: Option<RawLiteraryCreation>,

    #[serde(rename = "LiteraryCreation", default, deserialize_with = "lenient_block")]
    pub literary_creation: Option<RawLiteraryCreation>,

    #[serde(rename = "PublicationDate", default, deserialize_with = "lenient")]
    pub publication_date: Option<String>,

    #[serde(rename = "Image_url", default, deserialize_with = "lenient")]
    pub image_url: Option<String>,
}

impl RawBook {
    /// The literary creation block under whichever key is present
    pub fn creation(&self) -> Option<&RawLiteraryCreation> {
        self.literary_creation_legacy
            .as_ref()
            .or(self.literary_creation.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLiteraryCreation {
    #[serde(rename = "UniqueID", default, deserialize_with = "lenient")]
    pub unique_id: Option<String>,
    #[serde(rename = "Title", default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(rename = "Description", default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(rename = "Author", default, deserialize_with = "lenient_block")]
    pub author: Option<RawAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    #[serde(rename = "Name", default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// Deserialize any JSON value, keeping it only if it has the expected type
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`] for nested objects; an empty object counts as absent
fn lenient_block<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Object(ref map) if !map.is_empty() => Ok(serde_json::from_value(value).ok()),
        _ => Ok(None),
    }
}

/// Trimmed, non-blank text
fn clean(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(value: Option<&String>, field: &'static str) -> Result<String, ExtractError> {
    clean(value).ok_or(ExtractError::MissingRequiredField(field))
}

/// Customer columns carried by a record
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerFields {
    pub passport: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}

/// Book columns carried by a record
#[derive(Debug, Clone, PartialEq)]
pub struct BookFields {
    pub unique_id: String,
    pub title: String,
    pub author_name: Option<String>,
    pub description_html: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

/// Entity identity of a record: who, which book, which copy
#[derive(Debug, Clone, PartialEq)]
pub struct RecordIdentity {
    pub customer: CustomerFields,
    pub book: BookFields,
    pub call_number: String,
}

/// What happened and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordEvent {
    pub kind: EventKind,
    pub action_dt: DateTime<Utc>,
}

/// Fully extracted record, ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub identity: RecordIdentity,
    pub event: RecordEvent,
}

impl ImportRecord {
    pub fn passport(&self) -> &str {
        &self.identity.customer.passport
    }

    pub fn book_key(&self) -> &str {
        &self.identity.book.unique_id
    }

    pub fn copy_key(&self) -> &str {
        &self.identity.call_number
    }
}

impl RawRecord {
    /// Build from a parsed JSON object
    ///
    /// Never fails: mistyped or missing fields simply read as absent.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Trimmed call number, if any
    pub fn copy_key(&self) -> Option<String> {
        clean(self.book.as_ref().and_then(|b| b.call_number.as_ref()))
    }

    /// Trimmed book unique id, if any
    pub fn book_key(&self) -> Option<String> {
        clean(
            self.book
                .as_ref()
                .and_then(RawBook::creation)
                .and_then(|lc| lc.unique_id.as_ref()),
        )
    }

    /// Normalized event kind
    pub fn event_kind(&self) -> Result<EventKind, ExtractError> {
        let raw = self.kind.as_deref().unwrap_or("");
        EventKind::from_label(raw).ok_or_else(|| ExtractError::UnknownEventKind(raw.to_string()))
    }

    /// Event timestamp; absent or unrecognized values are an error
    pub fn event_timestamp(&self) -> Result<DateTime<Utc>, ExtractError> {
        let raw = self.action_date_time.as_deref().unwrap_or("");
        parse_timestamp(raw).ok_or_else(|| ExtractError::UnparsableTimestamp(raw.to_string()))
    }

    /// Kind and timestamp together
    pub fn extract_event(&self) -> Result<RecordEvent, ExtractError> {
        Ok(RecordEvent {
            kind: self.event_kind()?,
            action_dt: self.event_timestamp()?,
        })
    }

    /// Customer, book and copy identity
    ///
    /// Checked in the order passport, book unique id, title, call number;
    /// the first missing one is reported. Text fields are trimmed and blank
    /// optional ones read as absent.
    pub fn extract_identity(&self) -> Result<RecordIdentity, ExtractError> {
        let empty_customer = RawCustomer::default();
        let customer = self.customer.as_ref().unwrap_or(&empty_customer);
        let passport = required(customer.passport.as_ref(), "Customer.Passport")?;

        let empty_book = RawBook::default();
        let book = self.book.as_ref().unwrap_or(&empty_book);
        let empty_creation = RawLiteraryCreation::default();
        let creation = book.creation().unwrap_or(&empty_creation);

        let unique_id = required(creation.unique_id.as_ref(), "LiteraryCreation.UniqueID")?;
        let title = required(creation.title.as_ref(), "LiteraryCreation.Title")?;
        let call_number = required(book.call_number.as_ref(), "Book.LibraryCallNumber")?;

        Ok(RecordIdentity {
            customer: CustomerFields {
                passport,
                first_name: clean(customer.first_name.as_ref()).unwrap_or_default(),
                last_name: clean(customer.last_name.as_ref()).unwrap_or_default(),
                phone: clean(customer.phone.as_ref()),
                email: clean(customer.email.as_ref()),
                birth_date: customer.birth_date.as_deref().and_then(parse_timestamp),
                address: clean(customer.address.as_ref()),
                city: clean(customer.city.as_ref()),
                zip: clean(customer.zip.as_ref()),
            },
            book: BookFields {
                unique_id,
                title,
                author_name: clean(creation.author.as_ref().and_then(|a| a.name.as_ref())),
                description_html: clean(creation.description.as_ref()),
                publication_date: book.publication_date.as_deref().and_then(parse_timestamp),
                image_url: clean(book.image_url.as_ref()),
            },
            call_number,
        })
    }

    /// Everything needed to persist the record
    pub fn extract(&self) -> Result<ImportRecord, ExtractError> {
        Ok(ImportRecord {
            identity: self.extract_identity()?,
            event: self.extract_event()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        RawRecord::from_value(value)
    }

    fn full_record() -> RawRecord {
        record(json!({
            "Type": " Borrow ",
            "ActionDateTime": "2024-01-01T10:00:00Z",
            "Customer": {
                "Passport": "  P1 ",
                "FirstName": "Ann",
                "LastName": "Lee",
                "PhoneNumber": "555",
                "BirthDate": "1990-05-01",
                "City": "Springfield"
            },
            "Book": {
                "LibraryCallNumber": " C1 ",
                "PublicationDate": "2001-02-03",
                "Image_url": "http://img/1.png",
                "Literary Creation": {
                    "UniqueID": "U1",
                    "Title": " T1 ",
                    "Description": "<p>d</p>",
                    "Author": {"Name": "Writer"}
                }
            }
        }))
    }

    #[test]
    fn test_extract_full_record() {
        let extracted = full_record().extract().unwrap();

        assert_eq!(extracted.passport(), "P1");
        assert_eq!(extracted.book_key(), "U1");
        assert_eq!(extracted.copy_key(), "C1");
        assert_eq!(extracted.identity.book.title, "T1");
        assert_eq!(extracted.identity.book.author_name.as_deref(), Some("Writer"));
        assert_eq!(extracted.identity.book.description_html.as_deref(), Some("<p>d</p>"));
        assert!(extracted.identity.book.publication_date.is_some());
        assert_eq!(extracted.identity.customer.first_name, "Ann");
        assert_eq!(extracted.identity.customer.city.as_deref(), Some("Springfield"));
        assert!(extracted.identity.customer.birth_date.is_some());
        assert_eq!(extracted.event.kind, EventKind::Borrow);
    }

    #[test]
    fn test_literary_creation_spellings() {
        let unspaced = record(json!({
            "Book": {"LiteraryCreation": {"UniqueID": "U2"}}
        }));
        assert_eq!(unspaced.book_key().as_deref(), Some("U2"));

        // Legacy spelling wins when both are present
        let both = record(json!({
            "Book": {
                "Literary Creation": {"UniqueID": "LEGACY"},
                "LiteraryCreation": {"UniqueID": "NEW"}
            }
        }));
        assert_eq!(both.book_key().as_deref(), Some("LEGACY"));

        // An empty legacy block falls through to the other spelling
        let empty_legacy = record(json!({
            "Book": {
                "Literary Creation": {},
                "LiteraryCreation": {"UniqueID": "NEW"}
            }
        }));
        assert_eq!(empty_legacy.book_key().as_deref(), Some("NEW"));
    }

    #[test]
    fn test_missing_passport() {
        let mut value = json!({
            "Type": "BORROW",
            "ActionDateTime": "2024-01-01T10:00:00Z",
            "Customer": {"FirstName": "Ann"},
            "Book": {"LibraryCallNumber": "C1", "LiteraryCreation": {"UniqueID": "U1", "Title": "T1"}}
        });
        assert_eq!(
            record(value.clone()).extract().unwrap_err(),
            ExtractError::MissingRequiredField("Customer.Passport")
        );

        value["Customer"]["Passport"] = json!("   ");
        assert_eq!(
            record(value).extract().unwrap_err(),
            ExtractError::MissingRequiredField("Customer.Passport")
        );
    }

    #[test]
    fn test_identity_fields_checked_in_order() {
        let r = record(json!({
            "Customer": {"Passport": "P1"},
            "Book": {"LiteraryCreation": {"Title": "T1"}}
        }));
        assert_eq!(
            r.extract_identity().unwrap_err(),
            ExtractError::MissingRequiredField("LiteraryCreation.UniqueID")
        );

        let r = record(json!({
            "Customer": {"Passport": "P1"},
            "Book": {"LiteraryCreation": {"UniqueID": "U1"}}
        }));
        assert_eq!(
            r.extract_identity().unwrap_err(),
            ExtractError::MissingRequiredField("LiteraryCreation.Title")
        );

        let r = record(json!({
            "Customer": {"Passport": "P1"},
            "Book": {"LiteraryCreation": {"UniqueID": "U1", "Title": "T1"}}
        }));
        assert_eq!(
            r.extract_identity().unwrap_err(),
            ExtractError::MissingRequiredField("Book.LibraryCallNumber")
        );
    }

    #[test]
    fn test_unknown_kind() {
        let r = record(json!({"Type": "LOST", "ActionDateTime": "2024-01-01"}));
        assert_eq!(
            r.extract_event().unwrap_err(),
            ExtractError::UnknownEventKind("LOST".to_string())
        );

        let r = record(json!({"ActionDateTime": "2024-01-01"}));
        assert!(matches!(r.extract_event(), Err(ExtractError::UnknownEventKind(_))));
    }

    #[test]
    fn test_unparsable_or_missing_timestamp() {
        let r = record(json!({"Type": "RELEASE", "ActionDateTime": "soon"}));
        assert_eq!(
            r.extract_event().unwrap_err(),
            ExtractError::UnparsableTimestamp("soon".to_string())
        );

        let r = record(json!({"Type": "RELEASE"}));
        assert!(matches!(r.extract_event(), Err(ExtractError::UnparsableTimestamp(_))));
    }

    #[test]
    fn test_mistyped_fields_read_as_absent() {
        let r = record(json!({
            "Type": 7,
            "Customer": "not an object",
            "Book": {"LibraryCallNumber": 12, "LiteraryCreation": {"UniqueID": ["U1"]}}
        }));

        assert!(r.kind.is_none());
        assert!(r.customer.is_none());
        assert!(r.copy_key().is_none());
        assert!(r.book_key().is_none());
    }

    #[test]
    fn test_descriptive_fields_are_trimmed() {
        let r = record(json!({
            "Customer": {
                "Passport": "P1",
                "FirstName": "  Ann ",
                "LastName": "\tLee\n",
                "PhoneNumber": " 555 ",
                "Email": "   ",
                "Address": " 1 Main St ",
                "City": " Springfield ",
                "Zip": " 12345 "
            },
            "Book": {
                "LibraryCallNumber": "C1",
                "Image_url": " http://img/1.png ",
                "LiteraryCreation": {
                    "UniqueID": "U1",
                    "Title": "T1",
                    "Description": " <p>d</p> ",
                    "Author": {"Name": "  Writer  "}
                }
            }
        }));

        let identity = r.extract_identity().unwrap();
        let customer = &identity.customer;
        assert_eq!(customer.first_name, "Ann");
        assert_eq!(customer.last_name, "Lee");
        assert_eq!(customer.phone.as_deref(), Some("555"));
        assert!(customer.email.is_none());
        assert_eq!(customer.address.as_deref(), Some("1 Main St"));
        assert_eq!(customer.city.as_deref(), Some("Springfield"));
        assert_eq!(customer.zip.as_deref(), Some("12345"));

        let book = &identity.book;
        assert_eq!(book.author_name.as_deref(), Some("Writer"));
        assert_eq!(book.description_html.as_deref(), Some("<p>d</p>"));
        assert_eq!(book.image_url.as_deref(), Some("http://img/1.png"));
    }

    #[test]
    fn test_blank_names_become_empty() {
        let r = record(json!({
            "Customer": {"Passport": "P1", "FirstName": "   "},
            "Book": {"LibraryCallNumber": "C1", "LiteraryCreation": {"UniqueID": "U1", "Title": "T1"}}
        }));

        let identity = r.extract_identity().unwrap();
        assert_eq!(identity.customer.first_name, "");
        assert_eq!(identity.customer.last_name, "");
    }

    #[test]
    fn test_author_must_be_object() {
        let r = record(json!({
            "Customer": {"Passport": "P1"},
            "Book": {
                "LibraryCallNumber": "C1",
                "LiteraryCreation": {"UniqueID": "U1", "Title": "T1", "Author": "Plain String"}
            }
        }));

        let identity = r.extract_identity().unwrap();
        assert!(identity.book.author_name.is_none());
    }
}
