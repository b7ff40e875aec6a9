//! Server-of-record adapter speaking the PostgREST dialect over HTTPS.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{
    domain::{
        ids::{StudentId, ThreadId},
        records::{
            MembershipRecord, MessageRecord, NewMessage, ParticipantRecord, StudentProfile,
            ThreadRecord,
        },
    },
    usecases::contracts::{ApiError, DirectoryLookup, InboxApi, MessagesQuery},
};

const PARTICIPANTS_TABLE: &str = "thread_participants";
const THREADS_TABLE: &str = "threads";
const MESSAGES_TABLE: &str = "messages";
const STUDENTS_TABLE: &str = "students";
const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Debug, Clone)]
pub struct RestApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestApi {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        table_url(&self.base_url, table)
    }

    fn get(&self, table: &str) -> RequestBuilder {
        self.authorized(self.client.get(self.table_url(table)))
    }

    fn post(&self, table: &str) -> RequestBuilder {
        self.authorized(self.client.post(self.table_url(table)))
            .header("Prefer", RETURN_REPRESENTATION)
    }

    fn delete(&self, table: &str) -> RequestBuilder {
        self.authorized(self.client.delete(self.table_url(table)))
            .header("Prefer", RETURN_REPRESENTATION)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Sends a request whose response body is a JSON array of rows.
    async fn rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        check_status(response.status())?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|error| ApiError::InvalidData(error.to_string()))
    }

    /// Like [`Self::rows`] but expects at least one row back.
    async fn first_row<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or(ApiError::NotFound)
    }
}

impl InboxApi for RestApi {
    async fn list_memberships(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<MembershipRecord>, ApiError> {
        let request = self.get(PARTICIPANTS_TABLE).query(&[
            ("select", "thread_id,student_id,created_at".to_owned()),
            ("student_id", eq(student_id)),
        ]);
        self.rows(request).await
    }

    async fn list_participants(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Vec<ParticipantRecord>, ApiError> {
        let request = self.get(PARTICIPANTS_TABLE).query(&[
            ("select", "thread_id,student_id".to_owned()),
            ("thread_id", eq(thread_id)),
        ]);
        self.rows(request).await
    }

    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        query: MessagesQuery,
    ) -> Result<Vec<MessageRecord>, ApiError> {
        let request = self.get(MESSAGES_TABLE).query(&messages_filter(thread_id, query));
        self.rows(request).await
    }

    async fn create_message(&self, message: &NewMessage) -> Result<MessageRecord, ApiError> {
        let request = self.post(MESSAGES_TABLE).json(message);
        self.first_row(request).await
    }

    async fn create_thread(&self) -> Result<ThreadRecord, ApiError> {
        let request = self.post(THREADS_TABLE).json(&json!({}));
        self.first_row(request).await
    }

    async fn add_participant(
        &self,
        thread_id: &ThreadId,
        student_id: StudentId,
    ) -> Result<(), ApiError> {
        let request = self.post(PARTICIPANTS_TABLE).json(&ParticipantRecord {
            thread_id: thread_id.clone(),
            student_id,
        });
        self.first_row::<ParticipantRecord>(request).await.map(|_| ())
    }

    async fn remove_participant(
        &self,
        thread_id: &ThreadId,
        student_id: StudentId,
    ) -> Result<(), ApiError> {
        let request = self.delete(PARTICIPANTS_TABLE).query(&[
            ("thread_id", eq(thread_id)),
            ("student_id", eq(student_id)),
        ]);
        self.first_row::<ParticipantRecord>(request).await.map(|_| ())
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> Result<(), ApiError> {
        let request = self.delete(THREADS_TABLE).query(&[("id", eq(thread_id))]);
        self.first_row::<ThreadRecord>(request).await.map(|_| ())
    }
}

impl DirectoryLookup for RestApi {
    async fn lookup_student(&self, student_id: StudentId) -> Result<StudentProfile, ApiError> {
        let request = self
            .get(STUDENTS_TABLE)
            .query(&[("select", "id,name".to_owned()), ("id", eq(student_id))]);
        self.first_row(request).await
    }
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{base_url}/rest/v1/{table}")
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn messages_filter(thread_id: &ThreadId, query: MessagesQuery) -> Vec<(&'static str, String)> {
    let order = if query.newest_first {
        "created_at.desc"
    } else {
        "created_at.asc"
    };

    let mut filter = vec![
        ("select", "id,thread_id,sender_id,content,created_at".to_owned()),
        ("thread_id", eq(thread_id)),
        ("order", order.to_owned()),
    ];
    if let Some(limit) = query.limit {
        filter.push(("limit", limit.to_string()));
    }
    filter
}

fn check_status(status: StatusCode) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }

    Err(match status.as_u16() {
        401 | 403 => ApiError::Unauthorized,
        404 => ApiError::NotFound,
        code if status.is_server_error() => ApiError::Unavailable(format!("status {code}")),
        code => ApiError::Status(code),
    })
}

fn transport_error(error: reqwest::Error) -> ApiError {
    if error.is_decode() {
        return ApiError::InvalidData(error.to_string());
    }
    ApiError::Unavailable(error.to_string())
}
