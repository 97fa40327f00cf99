use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;
use crate::logging;
use crate::models::{LearningLevel, LevelCounts, ReadingText, Term, TermRange};

/// Server operations the reading view depends on.
///
/// Implementations block; callers run them off the UI thread.
pub trait TextApi: Send + Sync {
    fn get_text_read(&self, text_id: u64) -> Result<ReadingText, NetworkError>;
    fn get_text_terms(&self, text_id: u64, from: usize, to: usize)
    -> Result<TermRange, NetworkError>;
    fn get_term_count(&self, text_id: u64) -> Result<usize, NetworkError>;
    fn get_processed_term_count(&self, text_id: u64) -> Result<usize, NetworkError>;
    fn set_text_bookmark(&self, text_id: u64, index: usize) -> Result<(), NetworkError>;
    fn get_term_meaning(&self, term_id: u64, index: usize) -> Result<Option<String>, NetworkError>;
    fn get_term_count_in_text(&self, term_id: u64, text_id: u64)
    -> Result<Option<u32>, NetworkError>;
    fn get_term_count_by_learning_level(&self, text_id: u64) -> Result<LevelCounts, NetworkError>;
    fn edit_term(&self, term: &Term) -> Result<(), NetworkError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadingTextResponse {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    bookmark: Option<usize>,
    #[serde(default)]
    term_count: usize,
    #[serde(default)]
    processed_term_count: usize,
}

#[derive(Debug, Deserialize)]
struct TermsResponse {
    #[serde(default)]
    terms: Vec<Term>,
    #[serde(default)]
    begin: Option<usize>,
    #[serde(default)]
    end: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TermCountResponse {
    term_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessedTermCountResponse {
    processed_term_count: usize,
}

#[derive(Debug, Deserialize)]
struct MeaningResponse {
    #[serde(default)]
    meaning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountInTextResponse {
    #[serde(default)]
    count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct BookmarkBody {
    index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditTermBody<'a> {
    id: u64,
    content: &'a str,
    learning_level: LearningLevel,
}

/// [`TextApi`] over the server's JSON HTTP interface.
#[derive(Debug, Clone)]
pub struct HttpTextApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTextApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> eyre::Result<Self> {
        let mut builder = Client::builder().timeout(timeout).user_agent("lingo-reader");
        if base_url.starts_with("http://127.0.0.1") || base_url.starts_with("http://localhost") {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("bearer {token}")),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, NetworkError> {
        let url = self.url(path);
        logging::debug(format!("GET {url} {query:?}"));
        let response = self
            .authorized(self.client.get(&url).query(query))
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    fn send_json<B: Serialize>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> Result<(), NetworkError> {
        self.authorized(request.json(body)).send()?.error_for_status()?;
        Ok(())
    }
}

impl TextApi for HttpTextApi {
    fn get_text_read(&self, text_id: u64) -> Result<ReadingText, NetworkError> {
        let response: ReadingTextResponse = self.get_json(&format!("text/{text_id}"), &[])?;
        Ok(ReadingText {
            id: response.id,
            title: response.title,
            language_code: response.language_code,
            term_count: response.term_count,
            processed_term_count: response.processed_term_count,
            bookmark: response.bookmark,
            terms_count_by_learning_level: None,
        })
    }

    fn get_text_terms(
        &self,
        text_id: u64,
        from: usize,
        to: usize,
    ) -> Result<TermRange, NetworkError> {
        let response: TermsResponse = self.get_json(
            &format!("text/{text_id}/terms"),
            &[("indexfrom", from.to_string()), ("indexto", to.to_string())],
        )?;
        let begin = response.begin.unwrap_or(from);
        // Terms arrive in document order starting at the served begin.
        let terms = response
            .terms
            .into_iter()
            .enumerate()
            .map(|(offset, mut term)| {
                term.index = begin + offset;
                term
            })
            .collect();
        Ok(TermRange {
            terms,
            begin,
            end: response.end.unwrap_or(to),
        })
    }

    fn get_term_count(&self, text_id: u64) -> Result<usize, NetworkError> {
        let response: TermCountResponse =
            self.get_json(&format!("text/{text_id}/term-count"), &[])?;
        Ok(response.term_count)
    }

    fn get_processed_term_count(&self, text_id: u64) -> Result<usize, NetworkError> {
        let response: ProcessedTermCountResponse =
            self.get_json(&format!("text/{text_id}/processed-term-count"), &[])?;
        Ok(response.processed_term_count)
    }

    fn set_text_bookmark(&self, text_id: u64, index: usize) -> Result<(), NetworkError> {
        let request = self.client.patch(self.url(&format!("text/{text_id}/bookmark")));
        self.send_json(request, &BookmarkBody { index })
    }

    fn get_term_meaning(&self, term_id: u64, index: usize) -> Result<Option<String>, NetworkError> {
        let response: MeaningResponse = self.get_json(
            &format!("term/{term_id}/meaning"),
            &[("index", index.to_string())],
        )?;
        Ok(response.meaning.filter(|m| !m.trim().is_empty()))
    }

    fn get_term_count_in_text(
        &self,
        term_id: u64,
        text_id: u64,
    ) -> Result<Option<u32>, NetworkError> {
        let response: CountInTextResponse =
            self.get_json(&format!("term/{term_id}/count"), &[("textId", text_id.to_string())])?;
        Ok(response.count)
    }

    fn get_term_count_by_learning_level(&self, text_id: u64) -> Result<LevelCounts, NetworkError> {
        let response: BTreeMap<LearningLevel, usize> =
            self.get_json(&format!("text/{text_id}/term-count-by-level"), &[])?;
        Ok(LevelCounts(response))
    }

    fn edit_term(&self, term: &Term) -> Result<(), NetworkError> {
        let Some(id) = term.id else {
            return Ok(());
        };
        let request = self.client.put(self.url(&format!("term/{id}")));
        self.send_json(
            request,
            &EditTermBody {
                id,
                content: &term.content,
                learning_level: term.learning_level,
            },
        )
    }
}
