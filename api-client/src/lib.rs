//! A thin HTTP client: base-URL resolution, default authorization and
//! JSON or form bodies over reqwest, with typed response errors.

mod api_client;

pub use api_client::{
    ApiClient, ClientError, RequestBody, RequestOptions, ok_body, ok_empty,
    to_form_data,
};
pub use reqwest::{Method, StatusCode};
