//! Setup result holding the long-lived content clients, plus the static
//! props and live query helpers built on top of them.

use crate::app::live_query::{self, LiveQuery};
use crate::domain::client_kind::ClientKind;
use crate::domain::props::{SanityProps, StaticProps, StaticPropsContext};
use crate::domain::source::{ContentSource, QueryParams};
use crate::error::{ConfigError, FetchError, SanityError};
use crate::infra::config::ClientConfig;
use crate::infra::sanity::{ContentClient, ImageUrlBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Inputs for one static props resolution.
#[derive(Debug, Clone, Copy)]
pub struct StaticPropsArgs<'a> {
    pub query: &'a str,
    pub context: &'a StaticPropsContext,
    /// Overrides `context.params` when set.
    pub params: Option<&'a QueryParams>,
    /// Use the token-carrying client outside preview mode.
    pub authenticated: bool,
}

impl<'a> StaticPropsArgs<'a> {
    pub fn new(query: &'a str, context: &'a StaticPropsContext) -> Self {
        Self {
            query,
            context,
            params: None,
            authenticated: false,
        }
    }

    pub fn params(mut self, params: &'a QueryParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }
}

/// Owns one client per available [`ClientKind`] for the life of the process.
///
/// Clients are built once and only read afterwards, so a shared reference
/// can be used from any number of request tasks.
pub struct NextSanity<C = ContentClient> {
    config: ClientConfig,
    anonymous: Arc<C>,
    authenticated: Option<Arc<C>>,
    preview: Option<Arc<C>>,
}

impl NextSanity<ContentClient> {
    /// Validates `config` and builds the HTTP clients.
    ///
    /// Token-carrying clients are only built when a token is configured;
    /// asking for them later without one is a [`ConfigError::MissingToken`].
    pub fn setup(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = reqwest::Client::new();
        let anonymous = ContentClient::new(http.clone(), &config, ClientKind::Anonymous)?;
        let (authenticated, preview) = if config.has_token() {
            (
                Some(ContentClient::new(http.clone(), &config, ClientKind::Authenticated)?),
                Some(ContentClient::new(http, &config, ClientKind::Preview)?),
            )
        } else {
            (None, None)
        };

        tracing::info!(
            project_id = %config.project_id(),
            dataset = %config.dataset(),
            preview_available = preview.is_some(),
            "content clients ready"
        );
        Ok(Self::from_parts(config, anonymous, authenticated, preview))
    }
}

impl<C: ContentSource + 'static> NextSanity<C> {
    /// Assembles a setup result from pre-built clients.
    pub fn from_parts(
        config: ClientConfig,
        anonymous: C,
        authenticated: Option<C>,
        preview: Option<C>,
    ) -> Self {
        Self {
            config,
            anonymous: Arc::new(anonymous),
            authenticated: authenticated.map(Arc::new),
            preview: preview.map(Arc::new),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }

    fn shared(&self, kind: ClientKind) -> Result<&Arc<C>, ConfigError> {
        let client = match kind {
            ClientKind::Anonymous => Some(&self.anonymous),
            ClientKind::Authenticated => self.authenticated.as_ref(),
            ClientKind::Preview => self.preview.as_ref(),
        };
        client.ok_or(ConfigError::MissingToken { kind })
    }

    /// The client for `kind`. Always the same instance for the same kind.
    pub fn client(&self, kind: ClientKind) -> Result<&C, ConfigError> {
        self.shared(kind).map(|client| client.as_ref())
    }

    /// Live client when `use_preview`, cached client otherwise.
    pub fn select_client(&self, use_preview: bool) -> Result<&C, ConfigError> {
        self.client(ClientKind::for_request(use_preview, false))
    }

    pub fn image_url_builder(&self) -> ImageUrlBuilder {
        ImageUrlBuilder::new(&self.config)
    }

    async fn resolve(&self, args: StaticPropsArgs<'_>) -> Result<SanityProps, SanityError> {
        let preview = args.context.is_preview();
        let params = args.context.resolve_params(args.params);
        let kind = ClientKind::for_request(preview, args.authenticated);
        let client = self.client(kind)?;

        tracing::debug!(client_kind = %kind, preview, "resolving static props");
        let data = client.fetch(args.query, &params).await?;

        Ok(SanityProps {
            data,
            preview,
            params,
        })
    }

    /// Runs the query and returns the typed `{ data, preview, params }` envelope.
    pub async fn static_props<T: DeserializeOwned>(
        &self,
        args: StaticPropsArgs<'_>,
    ) -> Result<SanityProps<T>, SanityError> {
        let SanityProps {
            data,
            preview,
            params,
        } = self.resolve(args).await?;
        let data = serde_json::from_value(data).map_err(FetchError::Decode)?;
        Ok(SanityProps {
            data,
            preview,
            params,
        })
    }

    /// Runs the query and merges the envelope into `base` (see [`StaticProps::merge`]).
    pub async fn fetch_static_props(
        &self,
        args: StaticPropsArgs<'_>,
        base: Option<StaticProps>,
    ) -> Result<StaticProps, SanityError> {
        let envelope = self.resolve(args).await?;
        Ok(StaticProps::merge(envelope, base))
    }

    /// Live view of a query result.
    ///
    /// Outside preview this returns the envelope data as a fixed snapshot and
    /// opens nothing. In preview it subscribes through the preview client,
    /// which must then exist, and fails with [`ConfigError::NoRuntime`]
    /// outside a Tokio runtime.
    pub fn use_live_query<T>(
        &self,
        query: &str,
        props: &SanityProps<T>,
    ) -> Result<LiveQuery<T>, ConfigError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        if !props.preview {
            return Ok(LiveQuery::fixed(props.data.clone()));
        }

        let source = Arc::clone(self.shared(ClientKind::Preview)?);
        tracing::debug!(param_count = props.params.len(), "opening live query");
        live_query::subscribe(
            source,
            query.to_string(),
            props.params.clone(),
            props.data.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{ListenEvent, ListenStream};
    use crate::error::ChannelError;
    use async_trait::async_trait;
    use futures_util::stream::{self, StreamExt};
    use serde_json::{json, Value as JsonValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Deterministic in-memory source recording every call.
    #[derive(Debug, Default)]
    struct FakeSource {
        name: &'static str,
        results: Mutex<Vec<JsonValue>>,
        events: Vec<ListenEvent>,
        fetches: Mutex<Vec<(String, QueryParams)>>,
        listens: AtomicUsize,
    }

    impl FakeSource {
        fn named(name: &'static str) -> Self {
            Self {
                name,
                ..Default::default()
            }
        }

        fn returning(mut self, results: Vec<JsonValue>) -> Self {
            self.results = Mutex::new(results);
            self
        }

        fn with_events(mut self, events: Vec<ListenEvent>) -> Self {
            self.events = events;
            self
        }
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn fetch(&self, query: &str, params: &QueryParams) -> Result<JsonValue, FetchError> {
            self.fetches
                .lock()
                .unwrap()
                .push((query.to_string(), params.clone()));
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                return Ok(json!({ "from": self.name }));
            }
            Ok(results.remove(0))
        }

        async fn listen(&self, _query: &str, _params: &QueryParams) -> Result<ListenStream, FetchError> {
            self.listens.fetch_add(1, Ordering::SeqCst);
            Ok(stream::iter(self.events.clone().into_iter().map(Ok)).boxed())
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("abc123", "production").with_token("tok")
    }

    fn full() -> NextSanity<FakeSource> {
        NextSanity::from_parts(
            config(),
            FakeSource::named("anonymous"),
            Some(FakeSource::named("authenticated")),
            Some(FakeSource::named("preview")),
        )
    }

    fn without_token() -> NextSanity<FakeSource> {
        NextSanity::from_parts(
            ClientConfig::new("abc123", "production"),
            FakeSource::named("anonymous"),
            None,
            None,
        )
    }

    fn params(v: JsonValue) -> QueryParams {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn select_client_picks_live_iff_preview() {
        let sanity = full();
        assert_eq!(sanity.select_client(true).unwrap().name, "preview");
        assert_eq!(sanity.select_client(false).unwrap().name, "anonymous");
    }

    #[test]
    fn select_client_is_referentially_stable() {
        let sanity = full();
        for flag in [true, false] {
            let first = sanity.select_client(flag).unwrap();
            let second = sanity.select_client(flag).unwrap();
            assert!(std::ptr::eq(first, second));
        }
        assert!(!std::ptr::eq(
            sanity.select_client(true).unwrap(),
            sanity.select_client(false).unwrap()
        ));
    }

    #[test]
    fn token_kinds_are_config_errors_without_token() {
        let sanity = without_token();
        assert!(sanity.select_client(false).is_ok());
        assert_eq!(
            sanity.select_client(true).unwrap_err(),
            ConfigError::MissingToken {
                kind: ClientKind::Preview
            }
        );
        assert_eq!(
            sanity.client(ClientKind::Authenticated).unwrap_err(),
            ConfigError::MissingToken {
                kind: ClientKind::Authenticated
            }
        );
    }

    #[test]
    fn setup_builds_http_clients_per_kind() {
        let sanity = NextSanity::setup(config()).unwrap();
        assert!(sanity.has_preview());
        assert_eq!(
            sanity.client(ClientKind::Anonymous).unwrap().kind(),
            ClientKind::Anonymous
        );
        assert!(!sanity.select_client(true).unwrap().config().use_cdn());

        let anonymous_only = NextSanity::setup(ClientConfig::new("abc123", "production")).unwrap();
        assert!(!anonymous_only.has_preview());

        assert!(matches!(
            NextSanity::setup(ClientConfig::new("Bad Id", "production")),
            Err(ConfigError::InvalidProjectId(_))
        ));
    }

    #[tokio::test]
    async fn static_props_defaults_preview_false_and_empty_params() {
        let sanity = full();
        let ctx = StaticPropsContext::default();
        let props: SanityProps = sanity
            .static_props(StaticPropsArgs::new("*[_type == 'post']", &ctx))
            .await
            .unwrap();

        assert!(!props.preview);
        assert!(props.params.is_empty());
        assert_eq!(props.data, json!({ "from": "anonymous" }));
    }

    #[tokio::test]
    async fn static_props_client_and_params_resolution() {
        let sanity = full();
        let route = params(json!({ "slug": "about" }));
        let explicit = params(json!({ "slug": "override" }));

        let preview_ctx = StaticPropsContext::preview(json!({})).with_params(route.clone());
        let props: SanityProps = sanity
            .static_props(StaticPropsArgs::new("q", &preview_ctx).authenticated())
            .await
            .unwrap();
        assert!(props.preview);
        assert_eq!(props.params, route);
        assert_eq!(props.data, json!({ "from": "preview" }));

        let ctx = StaticPropsContext::default().with_params(route);
        let props: SanityProps = sanity
            .static_props(StaticPropsArgs::new("q", &ctx).params(&explicit).authenticated())
            .await
            .unwrap();
        assert_eq!(props.params, explicit);
        assert_eq!(props.data, json!({ "from": "authenticated" }));

        let recorded = sanity.authenticated.as_ref().unwrap().fetches.lock().unwrap().clone();
        assert_eq!(recorded, vec![("q".to_string(), explicit)]);
    }

    #[tokio::test]
    async fn static_props_decodes_typed_data() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Post {
            title: String,
        }

        let sanity = NextSanity::from_parts(
            config(),
            FakeSource::named("anonymous").returning(vec![json!({ "title": "Hello" })]),
            None,
            None,
        );
        let ctx = StaticPropsContext::default();
        let props: SanityProps<Post> = sanity
            .static_props(StaticPropsArgs::new("q", &ctx))
            .await
            .unwrap();
        assert_eq!(props.data, Post { title: "Hello".into() });

        let bad: Result<SanityProps<Post>, _> = sanity
            .static_props(StaticPropsArgs::new("q", &ctx))
            .await;
        assert!(matches!(bad, Err(SanityError::Fetch(FetchError::Decode(_)))));
    }

    #[tokio::test]
    async fn preview_without_token_fails_before_any_fetch() {
        let sanity = without_token();
        let ctx = StaticPropsContext::preview(json!({}));
        let result = sanity
            .fetch_static_props(StaticPropsArgs::new("q", &ctx), None)
            .await;
        assert!(matches!(
            result,
            Err(SanityError::Config(ConfigError::MissingToken { .. }))
        ));
        assert!(sanity.anonymous.fetches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_static_props_keeps_directives() {
        let sanity = full();
        let ctx = StaticPropsContext::default();
        let base = StaticProps::default()
            .revalidate(30)
            .with_directive("notFound", json!(false))
            .with_prop("nav", json!(["home"]));

        let merged = sanity
            .fetch_static_props(StaticPropsArgs::new("q", &ctx), Some(base.clone()))
            .await
            .unwrap();

        assert_eq!(merged.directives, base.directives);
        assert_eq!(merged.props["nav"], json!(["home"]));
        assert_eq!(merged.props["preview"], json!(false));
        assert_eq!(merged.props["params"], json!({}));
        assert_eq!(merged.props["data"], json!({ "from": "anonymous" }));
    }

    #[tokio::test]
    async fn fetch_static_props_is_idempotent() {
        let sanity = full();
        let ctx = StaticPropsContext::default().with_params(params(json!({ "slug": "a" })));
        let base = StaticProps::default().revalidate(5);

        let first = sanity
            .fetch_static_props(StaticPropsArgs::new("q", &ctx), Some(base.clone()))
            .await
            .unwrap();
        let second = sanity
            .fetch_static_props(StaticPropsArgs::new("q", &ctx), Some(base))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn live_query_outside_preview_opens_nothing() {
        let sanity = full();
        for data in [JsonValue::Null, json!({}), json!({ "title": "x" })] {
            let props = SanityProps {
                data: data.clone(),
                preview: false,
                params: QueryParams::new(),
            };
            let live = sanity.use_live_query("q", &props).unwrap();

            assert!(!live.is_subscribed());
            assert_eq!(
                live.state(),
                live_query::LiveQueryState {
                    data,
                    loading: false,
                    error: None
                }
            );
        }
        assert_eq!(sanity.preview.as_ref().unwrap().listens.load(Ordering::SeqCst), 0);
        assert_eq!(sanity.anonymous.listens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn live_query_in_preview_needs_token() {
        let props = SanityProps {
            data: json!(null),
            preview: true,
            params: QueryParams::new(),
        };
        assert!(matches!(
            without_token().use_live_query("q", &props),
            Err(ConfigError::MissingToken { .. })
        ));
    }

    #[test]
    fn live_query_in_preview_needs_a_runtime() {
        let props = SanityProps {
            data: json!(null),
            preview: true,
            params: QueryParams::new(),
        };
        assert_eq!(
            full().use_live_query("q", &props).unwrap_err(),
            ConfigError::NoRuntime
        );
        assert!(full().use_live_query("q", &SanityProps { preview: false, ..props }).is_ok());
    }

    #[tokio::test]
    async fn live_query_refetches_on_mutation() {
        let preview = FakeSource::named("preview")
            .returning(vec![json!({ "title": "edited" })])
            .with_events(vec![
                ListenEvent::Welcome {
                    listener_name: Some("l1".into()),
                },
                ListenEvent::Mutation {
                    document_id: Some("drafts.post-1".into()),
                    transition: Some("update".into()),
                },
            ]);
        let sanity = NextSanity::from_parts(config(), FakeSource::named("anonymous"), None, Some(preview));
        let props = SanityProps {
            data: json!({ "title": "original" }),
            preview: true,
            params: params(json!({ "slug": "post-1" })),
        };

        let mut live = sanity.use_live_query("q", &props).unwrap();
        assert!(live.is_subscribed());
        assert!(live.state().loading);
        assert_eq!(live.data(), json!({ "title": "original" }));

        // The fake stream ends after the mutation, which closes the channel.
        while live.state().error.is_none() {
            assert!(live.changed().await);
        }

        let state = live.state();
        assert_eq!(state.data, json!({ "title": "edited" }));
        assert!(!state.loading);
        assert_eq!(state.error, Some(ChannelError::Closed));

        let source = sanity.preview.as_ref().unwrap();
        assert_eq!(source.listens.load(Ordering::SeqCst), 1);
        assert_eq!(
            source.fetches.lock().unwrap().clone(),
            vec![("q".to_string(), params(json!({ "slug": "post-1" })))]
        );
    }

    #[tokio::test]
    async fn live_query_channel_error_is_terminal() {
        let preview = FakeSource::named("preview").with_events(vec![
            ListenEvent::ChannelError {
                message: "query not supported".into(),
            },
            ListenEvent::Mutation {
                document_id: None,
                transition: None,
            },
        ]);
        let sanity = NextSanity::from_parts(config(), FakeSource::named("anonymous"), None, Some(preview));
        let props = SanityProps {
            data: json!([]),
            preview: true,
            params: QueryParams::new(),
        };

        let mut live = sanity.use_live_query("q", &props).unwrap();
        while live.state().error.is_none() {
            assert!(live.changed().await);
        }

        assert_eq!(
            live.state().error,
            Some(ChannelError::Channel("query not supported".into()))
        );
        assert_eq!(live.data(), json!([]));
        assert!(sanity.preview.as_ref().unwrap().fetches.lock().unwrap().is_empty());
    }
}
