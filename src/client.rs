use crate::acl::ACL;
use crate::config::ClientConfig;
use crate::entry::Entry;
use crate::error::{ErrorCode, Result};
use crate::id::Identifier;
use crate::namespace::Namespace;
use crate::request::{self, Authenticator, PendingRequest, RequestBuilder};
use crate::response::{self, ResponseHandler};
use crate::transport;
use crate::values::Operation;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use surf::{http::Method, Url};
use tracing::{event, Level};

const UNAUTHORIZED: u16 = 401;
const LIST_OK: u16 = 200;
const ACL_OK: u16 = 200;

/// A client of the management API.
///
/// Every operation assembles a request from [RequestBuilder] steps, sends it, and interprets the
/// reply with [ResponseHandler] steps. The HTTP transport is built on first use and then shared
/// by all operations, which may run concurrently.
pub struct Client {
    config: ClientConfig,
    authenticator: Arc<dyn Authenticator>,
    transport: OnceCell<surf::Client>,
}

impl Client {
    pub fn new(config: ClientConfig, authenticator: impl Authenticator + 'static) -> Self {
        Self {
            config,
            authenticator: Arc::new(authenticator),
            transport: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn base(&self) -> &Url {
        &self.config.url
    }

    fn transport(&self) -> Result<&surf::Client> {
        self.transport
            .get_or_try_init(|| transport::build(&self.config))
    }

    fn authenticate<'a>(&self) -> RequestBuilder<'a> {
        request::authenticate(self.authenticator.clone())
    }

    /// Build a request with `builder`, send it, and interpret the reply with `handler`.
    ///
    /// Nothing is sent if `builder` fails. `handler` sees the reply whatever its status.
    pub async fn request_and_handle(
        &self,
        builder: RequestBuilder<'_>,
        handler: ResponseHandler<'_>,
    ) -> Result<()> {
        let mut request = PendingRequest::new();
        builder(&mut request)?;
        let reply = transport::send(self.transport()?, request).await?;
        handler(&reply)
    }

    /// Create `entry` in its collection.
    pub async fn create<E: Entry>(&self, entry: &E) -> Result<()> {
        let (codes, codes_step) = request::resolve_status_codes::<E>();
        self.request_and_handle(
            request::compose(vec![
                codes_step,
                request::method(Method::Post),
                request::service_url(self.base(), entry),
                request::output_mode_json(),
                request::body_values_selective(entry, Operation::Create),
                self.authenticate(),
            ]),
            response::compose(vec![
                unauthorized(),
                response::require_code(codes.created, response::messages_error()),
            ]),
        )
        .await
    }

    /// Read `entry` from the server, replacing it with the server's state.
    ///
    /// The entry's identifier must be complete enough to address it. On success the identifier
    /// also carries the URL the server reported.
    pub async fn read<E: Entry>(&self, entry: &mut E) -> Result<()> {
        let (codes, codes_step) = request::resolve_status_codes::<E>();
        let path = entry.entry_path();
        self.request_and_handle(
            request::compose(vec![
                codes_step,
                request::method(Method::Get),
                path_url(self.base(), path),
                request::output_mode_json(),
                self.authenticate(),
            ]),
            response::compose(vec![
                unauthorized(),
                not_found(codes.not_found),
                response::require_code(codes.read, response::messages_error()),
                response::decode_entry(entry),
            ]),
        )
        .await
    }

    /// Update the remote copy of `entry` with its update fields.
    pub async fn update<E: Entry>(&self, entry: &E) -> Result<()> {
        let (codes, codes_step) = request::resolve_status_codes::<E>();
        self.request_and_handle(
            request::compose(vec![
                codes_step,
                request::method(Method::Post),
                request::entry_url(self.base(), entry),
                request::output_mode_json(),
                request::body_values_selective(entry, Operation::Update),
                self.authenticate(),
            ]),
            response::compose(vec![
                unauthorized(),
                not_found(codes.not_found),
                response::require_code(codes.updated, response::messages_error()),
            ]),
        )
        .await
    }

    pub async fn delete<E: Entry>(&self, entry: &E) -> Result<()> {
        let (codes, codes_step) = request::resolve_status_codes::<E>();
        self.request_and_handle(
            request::compose(vec![
                codes_step,
                request::method(Method::Delete),
                request::entry_url(self.base(), entry),
                request::output_mode_json(),
                self.authenticate(),
            ]),
            response::compose(vec![
                unauthorized(),
                not_found(codes.not_found),
                response::require_code(codes.deleted, response::messages_error()),
            ]),
        )
        .await
    }

    /// All entries of type `E` in the default namespace.
    pub async fn list<E: Entry>(&self) -> Result<Vec<E>> {
        self.list_scoped(E::default()).await
    }

    /// All entries of type `E` visible in `namespace`.
    pub async fn list_namespace<E: Entry>(&self, namespace: Namespace) -> Result<Vec<E>> {
        let mut scope = E::default();
        *scope.id_mut().namespace_mut() = namespace;
        self.list_scoped(scope).await
    }

    /// All entries of the collection `id` addresses.
    ///
    /// Useful for identifiers whose collection depends on more than the namespace, like the conf
    /// file of a [ConfID](crate::ConfID).
    pub async fn list_id<E: Entry>(&self, id: E::Id) -> Result<Vec<E>> {
        let mut scope = E::default();
        *scope.id_mut() = id;
        self.list_scoped(scope).await
    }

    async fn list_scoped<E: Entry>(&self, scope: E) -> Result<Vec<E>> {
        let (_, codes_step) = request::resolve_status_codes::<E>();
        let mut entries = Vec::new();
        self.request_and_handle(
            request::compose(vec![
                codes_step,
                request::method(Method::Get),
                request::service_url(self.base(), &scope),
                request::output_mode_json(),
                request::query_value("count", "0"),
                self.authenticate(),
            ]),
            response::compose(vec![
                unauthorized(),
                response::require_code(LIST_OK, response::messages_error()),
                response::decode_entries(&mut entries),
            ]),
        )
        .await?;
        event!(
            Level::DEBUG,
            "listed {} entries of {} in {:?}",
            entries.len(),
            E::SERVICE,
            scope.id().namespace()
        );
        Ok(entries)
    }

    pub async fn read_acl<E: Entry>(&self, entry: &E) -> Result<ACL> {
        let (codes, codes_step) = request::resolve_status_codes::<E>();
        let mut acl = ACL::default();
        self.request_and_handle(
            request::compose(vec![
                codes_step,
                request::method(Method::Get),
                request::acl_url(self.base(), entry),
                request::output_mode_json(),
                self.authenticate(),
            ]),
            response::compose(vec![
                unauthorized(),
                not_found(codes.not_found),
                response::require_code(ACL_OK, response::messages_error()),
                response::decode_acl(&mut acl),
            ]),
        )
        .await?;
        Ok(acl)
    }

    /// Replace the access control list of `entry` with `acl`.
    pub async fn update_acl<E: Entry>(&self, entry: &E, acl: &ACL) -> Result<()> {
        let (codes, codes_step) = request::resolve_status_codes::<E>();
        self.request_and_handle(
            request::compose(vec![
                codes_step,
                request::method(Method::Post),
                request::acl_url(self.base(), entry),
                request::output_mode_json(),
                request::body_acl(acl),
                self.authenticate(),
            ]),
            response::compose(vec![
                unauthorized(),
                not_found(codes.not_found),
                response::require_code(ACL_OK, response::messages_error()),
            ]),
        )
        .await
    }
}

/// Set the URL from an entry path computed up front.
///
/// Used where the entry itself is the decoding target and can not also be borrowed by the
/// builder. A failed path still fails at its place in the chain.
fn path_url(base: &Url, path: Result<String>) -> RequestBuilder<'_> {
    match path {
        Ok(path) => request::url(base, path),
        Err(err) => request::fail_with(err),
    }
}

fn unauthorized<'a>() -> ResponseHandler<'a> {
    response::on_code(
        UNAUTHORIZED,
        response::messages_error_code(ErrorCode::Unauthorized),
    )
}

fn not_found<'a>(status: u16) -> ResponseHandler<'a> {
    response::on_code(status, response::messages_error_code(ErrorCode::NotFound))
}
