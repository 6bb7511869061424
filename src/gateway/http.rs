//! `reqwest`-backed implementation of the [`Gateway`] trait.

use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::gateway::{Gateway, GatewayError, GatewayResult, OntPatch, SearchParams};
use crate::model::{BBox, BacklogGroup, Cto, FeatureCollection, ImportSummary, Olt, Ont, Pon};

/// Wrapper used by every list endpoint. A missing or `null` `items` array
/// is an empty result, never an error.
#[derive(Deserialize)]
struct Items<T> {
    #[serde(default)]
    items: Option<Vec<T>>,
}

impl<T> Items<T> {
    fn into_vec(self) -> Vec<T> {
        self.items.unwrap_or_default()
    }
}

pub struct HttpGateway {
    client: Client,
    base: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> GatewayResult<Response> {
        let resp = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport {
                path: path.to_string(),
                detail: e.to_string(),
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> GatewayResult<T> {
        let resp = self
            .send(self.request(Method::GET, path).query(query), path)
            .await?;
        resp.json::<T>().await.map_err(|e| GatewayError::Shape {
            path: path.to_string(),
            detail: e.to_string(),
        })
    }
}

#[async_trait(?Send)]
impl Gateway for HttpGateway {
    async fn cto_layer(&self) -> GatewayResult<Vec<Cto>> {
        let collection: FeatureCollection = self.get_json("/ctos/geojson", &[]).await?;
        let mut ctos = Vec::with_capacity(collection.features.len());
        for feature in &collection.features {
            let (Some(uuid), Some(position)) = (feature.prop_str("uuid"), feature.position())
            else {
                tracing::warn!("skipping CTO feature without uuid or position");
                continue;
            };
            ctos.push(Cto {
                uuid,
                name: feature.prop_str("nombre").unwrap_or_default(),
                position,
            });
        }
        Ok(ctos)
    }

    async fn list_olts(&self) -> GatewayResult<Vec<Olt>> {
        Ok(self
            .get_json::<Items<Olt>>("/ui/olts", &[])
            .await?
            .into_vec())
    }

    async fn list_pons(&self, olt_id: &str) -> GatewayResult<Vec<Pon>> {
        let path = format!("/ui/olts/{olt_id}/pons");
        Ok(self.get_json::<Items<Pon>>(&path, &[]).await?.into_vec())
    }

    async fn onts_in_viewport(
        &self,
        bbox: &BBox,
        olt_id: &str,
        pon_id: &str,
    ) -> GatewayResult<Vec<Ont>> {
        let query = [
            ("bbox", bbox.to_query()),
            ("olt_id", olt_id.to_string()),
            ("pon_id", pon_id.to_string()),
        ];
        let collection: FeatureCollection = self.get_json("/ui/onts/geo", &query).await?;
        let mut onts = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let mut ont: Ont = match serde_json::from_value(feature.properties.clone()) {
                Ok(ont) => ont,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed ONT feature");
                    continue;
                }
            };
            if let Some(pos) = feature.position() {
                ont.lat = Some(pos.lat);
                ont.lon = Some(pos.lon);
            }
            onts.push(ont);
        }
        Ok(onts)
    }

    async fn unplaced_page(
        &self,
        olt_id: &str,
        pon_id: &str,
        limit: usize,
        offset: usize,
    ) -> GatewayResult<Vec<Ont>> {
        let query = [
            ("olt_id", olt_id.to_string()),
            ("pon_id", pon_id.to_string()),
            ("only_unlocated", "true".to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        Ok(self
            .get_json::<Items<Ont>>("/ui/onts", &query)
            .await?
            .into_vec())
    }

    async fn backlog_groups(&self) -> GatewayResult<Vec<BacklogGroup>> {
        Ok(self
            .get_json::<Items<BacklogGroup>>("/ui/unlocated/groups", &[])
            .await?
            .into_vec())
    }

    async fn search_onts(&self, params: &SearchParams) -> GatewayResult<Vec<Ont>> {
        let mut query = vec![
            ("q", params.query.clone()),
            ("only_unlocated", params.only_unlocated.to_string()),
            ("limit", params.limit.to_string()),
            ("offset", params.offset.to_string()),
        ];
        if let Some(olt_id) = &params.olt_id {
            query.push(("olt_id", olt_id.clone()));
        }
        if let Some(pon_id) = &params.pon_id {
            query.push(("pon_id", pon_id.clone()));
        }
        Ok(self
            .get_json::<Items<Ont>>("/ui/onts/search", &query)
            .await?
            .into_vec())
    }

    async fn patch_ont(&self, id: &str, patch: &OntPatch) -> GatewayResult<()> {
        let path = format!("/onts/{id}");
        let builder = self.request(Method::PATCH, &path).json(&patch.to_body());
        // Response body is ignored: the view is rebuilt from re-fetched
        // state, never from an optimistic echo.
        self.send(builder, &path).await?;
        Ok(())
    }

    async fn export_csv(&self) -> GatewayResult<Vec<u8>> {
        let path = "/onts/csv";
        let resp = self.send(self.request(Method::GET, path), path).await?;
        let bytes = resp.bytes().await.map_err(|e| GatewayError::Shape {
            path: path.to_string(),
            detail: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn import_csv(&self, filename: &str, bytes: Vec<u8>) -> GatewayResult<ImportSummary> {
        let path = "/onts/csv/import";
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        let resp = self
            .send(self.request(Method::POST, path).multipart(form), path)
            .await?;
        resp.json::<ImportSummary>()
            .await
            .map_err(|e| GatewayError::Shape {
                path: path.to_string(),
                detail: e.to_string(),
            })
    }
}
