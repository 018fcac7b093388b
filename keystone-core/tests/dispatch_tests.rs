//! End-to-end dispatch through a sample resource.

use bytes::Bytes;
use keystone_core::{
    Arguments, ContentPart, Dispatcher, DispatcherConfig, Entity, Error, HeaderMap, HttpMethod,
    HttpRequest, Operation, Param, Principal, RequestContext, Resource, RoleHandler,
    SecurityContext,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

struct Directory {
    users: Mutex<Vec<User>>,
}

impl Directory {
    fn seeded() -> Self {
        Self {
            users: Mutex::new(vec![
                User { id: 1, name: "Ann".into() },
                User { id: 7, name: "Bob".into() },
                User { id: 9, name: "Anita".into() },
            ]),
        }
    }

    fn all(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }
}

struct Admins;

impl RoleHandler for Admins {
    fn has_role(&self, principal: &Principal, role: &str) -> bool {
        principal.name() == "root" && role == "admin"
    }
}

#[derive(Debug)]
struct Rejected(Error);

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request rejected")
    }
}

impl std::error::Error for Rejected {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

struct Users {
    directory: Arc<Directory>,
    security: SecurityContext,
}

impl Users {
    fn list(&self, _args: Arguments) -> Result<Entity<Vec<User>>, Error> {
        Ok(Entity(self.directory.all()))
    }

    fn count(&self, _args: Arguments) -> Result<usize, Error> {
        Ok(self.directory.all().len())
    }

    fn search(&self, mut args: Arguments) -> Result<Entity<Vec<User>>, Error> {
        let q: String = args.take(0)?;
        let limit: Option<usize> = args.optional(1)?;
        let found = self
            .directory
            .all()
            .into_iter()
            .filter(|u| u.name.contains(&q))
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Ok(Entity(found))
    }

    fn whoami(&self, _args: Arguments) -> Result<String, Error> {
        let name = self
            .security
            .user_principal()
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| "anonymous".into());
        Ok(format!(
            "{} admin={} secure={} scheme={}",
            name,
            self.security.is_user_in_role("admin"),
            self.security.is_secure(),
            self.security.authentication_scheme().unwrap_or("none")
        ))
    }

    fn find(&self, mut args: Arguments) -> Result<Entity<User>, Error> {
        let id: u64 = args.take(0)?;
        self.directory
            .all()
            .into_iter()
            .find(|u| u.id == id)
            .map(Entity)
            .ok_or_else(|| Error::http(404, format!("no user {}", id)))
    }

    fn me(&self, _args: Arguments) -> Result<&'static str, Error> {
        Ok("unreachable")
    }

    fn raw(&self, mut args: Arguments) -> Result<String, Error> {
        let id: u64 = args.take(0)?;
        let request: Arc<HttpRequest> = args.take(1)?;
        let headers: HeaderMap = args.take(2)?;
        let body: Bytes = args.take(3)?;
        Ok(format!("{} {} {} {}", id, request.method, headers.len(), body.len()))
    }

    fn add(&self, mut args: Arguments) -> Result<Entity<User>, Error> {
        let user: User = args.take(0)?;
        if !self.security.is_user_in_role("admin") {
            return Err(Error::http(403, "admin role required"));
        }
        self.directory.users.lock().unwrap().push(user.clone());
        Ok(Entity(user))
    }

    fn create_from_form(&self, mut args: Arguments) -> Result<String, Error> {
        let id: u64 = args.take(0)?;
        let name: String = args.take(1)?;
        Ok(format!("{}={}", id, name))
    }

    fn remove(&self, mut args: Arguments) -> Result<(), Error> {
        let id: u64 = args.take(0)?;
        self.directory.users.lock().unwrap().retain(|u| u.id != id);
        Ok(())
    }

    fn fail_io(&self, _args: Arguments) -> Result<(), std::io::Error> {
        Err(std::io::Error::other("disk gone"))
    }

    fn fail_nested(&self, _args: Arguments) -> Result<(), Rejected> {
        Err(Rejected(Error::http(409, "already exists")))
    }

    fn fail_panic(&self, _args: Arguments) -> Result<(), Error> {
        panic!("exploded")
    }
}

impl Resource for Users {
    fn path() -> Option<&'static str> {
        Some("/users")
    }

    fn produces() -> Option<&'static [&'static str]> {
        Some(&["application/json", "application/xml"])
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::at_root(HttpMethod::GET).name("list").handler(Users::list),
            Operation::get("/count").name("count").handler(Users::count),
            Operation::get("/search")
                .name("search")
                .param(Param::query::<String>("q"))
                .param(Param::query::<usize>("limit"))
                .handler(Users::search),
            Operation::get("/whoami").name("whoami").handler(Users::whoami),
            Operation::get("/{id}")
                .name("find")
                .param(Param::path::<u64>("id"))
                .handler(Users::find),
            Operation::get("/me").name("me").handler(Users::me),
            Operation::post("/{id}/raw")
                .name("raw")
                .param(Param::path::<u64>("id"))
                .param(Param::request())
                .param(Param::headers())
                .param(Param::bytes())
                .handler(Users::raw),
            Operation::post("/")
                .name("create")
                .consumes(&["application/json"])
                .param(Param::body::<User>())
                .handler(Users::add),
            Operation::post("/form")
                .name("create_from_form")
                .param(Param::form::<u64>("id"))
                .param(Param::form::<String>("name"))
                .handler(Users::create_from_form),
            Operation::delete("/{id}")
                .name("remove")
                .param(Param::path::<u64>("id"))
                .handler(Users::remove),
            Operation::get("/fail/io").handler(Users::fail_io),
            Operation::get("/fail/nested").handler(Users::fail_nested),
            Operation::get("/fail/panic").handler(Users::fail_panic),
        ]
    }

    fn create(ctx: &RequestContext) -> Result<Self, Error> {
        let directory = ctx
            .get::<Directory>()
            .ok_or_else(|| Error::internal("no directory configured"))?;
        Ok(Users {
            directory,
            security: ctx.security().clone(),
        })
    }
}

fn dispatcher() -> Dispatcher<Users> {
    Dispatcher::builder()
        .role_handler(Admins)
        .context(Directory::seeded())
        .build()
        .unwrap()
}

fn request(method: &str, target: &str) -> HttpRequest {
    HttpRequest::new(method, target).with_content(ContentPart::empty())
}

fn json_post(target: &str, body: &str) -> HttpRequest {
    HttpRequest::new("POST", target).with_content(
        ContentPart::empty()
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string()),
    )
}

fn body(response: &keystone_core::HttpResponse) -> String {
    String::from_utf8(response.body.to_vec()).unwrap()
}

#[test]
fn test_path_variable_is_bound() {
    let response = dispatcher().handle(request("GET", "/users/7")).unwrap().unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some("application/json"));
    let user: User = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(user, User { id: 7, name: "Bob".into() });
}

#[test]
fn test_accept_header_selects_xml() {
    let req = HttpRequest::new("GET", "/users/1")
        .with_content(ContentPart::empty().with_header("Accept", "application/xml"));
    let response = dispatcher().handle(req).unwrap().unwrap();

    assert_eq!(response.content_type(), Some("application/xml"));
    assert!(body(&response).contains("<name>Ann</name>"));
}

#[test]
fn test_non_ascii_accept_falls_back_to_first_produced() {
    let req = HttpRequest::new("GET", "/users/7")
        .with_content(ContentPart::empty().with_header("Accept", "İİ;q=1"));
    let response = dispatcher().handle(req).unwrap().unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some("application/json"));
}

#[test]
fn test_unacceptable_accept_falls_back_to_first_produced() {
    let req = HttpRequest::new("GET", "/users/1")
        .with_content(ContentPart::empty().with_header("Accept", "text/csv"));
    let response = dispatcher().handle(req).unwrap().unwrap();
    assert_eq!(response.content_type(), Some("application/json"));
}

#[test]
fn test_resource_root_and_trailing_slash() {
    let dispatcher = dispatcher();
    for target in ["/users", "/users/"] {
        let response = dispatcher.handle(request("GET", target)).unwrap().unwrap();
        let users: Vec<User> = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(users.len(), 3, "listing via {}", target);
    }
}

#[test]
fn test_scalar_reply_is_plain_text() {
    let response = dispatcher().handle(request("GET", "/users/count")).unwrap().unwrap();
    assert_eq!(response.content_type(), Some("text/plain"));
    assert_eq!(body(&response), "3");
}

#[test]
fn test_query_parameters() {
    let response = dispatcher()
        .handle(request("GET", "/users/search?q=An&limit=1"))
        .unwrap()
        .unwrap();
    let users: Vec<User> = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(users, vec![User { id: 1, name: "Ann".into() }]);

    let response = dispatcher()
        .handle(request("GET", "/users/search?q=An"))
        .unwrap()
        .unwrap();
    let users: Vec<User> = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(users.len(), 2);
}

#[test]
fn test_missing_and_invalid_parameters() {
    let err = dispatcher().handle(request("GET", "/users/search")).unwrap_err();
    assert!(matches!(err, Error::MissingParameter(_)));
    assert_eq!(err.status_code(), 400);

    let err = dispatcher()
        .handle(request("GET", "/users/search?q=a&limit=many"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn test_first_registered_route_wins() {
    // "/{id}" is declared before "/me" and captures it
    let err = dispatcher().handle(request("GET", "/users/me")).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn test_path_is_normalised() {
    let response = dispatcher()
        .handle(request("GET", "/users/9/..//./7"))
        .unwrap()
        .unwrap();
    let user: User = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(user.id, 7);
}

#[test]
fn test_requests_outside_the_prefix_are_not_handled() {
    let dispatcher = dispatcher();
    assert!(dispatcher.handle(request("GET", "/orders/7")).unwrap().is_none());
    assert!(dispatcher.handle(request("GET", "/users/7/extra/path")).unwrap().is_none());
    assert!(dispatcher.handle(request("PUT", "/users/7")).unwrap().is_none());
}

#[test]
fn test_request_without_content_is_not_handled() {
    let result = dispatcher().handle(HttpRequest::new("PATCH", "/users/%FF%FE"));
    assert!(matches!(result, Ok(None)));
}

#[test]
fn test_unsupported_method() {
    let err = dispatcher().handle(request("PATCH", "/users/7")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedMethod(ref m) if m == "PATCH"));
    assert_eq!(err.status_code(), 500);
}

#[test]
fn test_base_path() {
    let dispatcher = Dispatcher::<Users>::builder()
        .base_path("/api")
        .context(Directory::seeded())
        .build()
        .unwrap();
    assert_eq!(dispatcher.prefix(), "/api/users");

    assert!(dispatcher.handle(request("GET", "/api/users/7")).unwrap().is_some());
    assert!(dispatcher.handle(request("GET", "/users/7")).unwrap().is_none());
    assert!(dispatcher.handle(request("GET", "/api")).unwrap().is_none());
}

#[test]
fn test_typed_body_requires_consumed_type() {
    let req = HttpRequest::new("POST", "/users").with_content(
        ContentPart::empty()
            .with_header("Content-Type", "application/xml")
            .with_body("<User><id>3</id><name>Cy</name></User>"),
    );
    let err = dispatcher().handle(req).unwrap_err();
    assert!(matches!(err, Error::InvalidContentType(_)));
    assert_eq!(err.status_code(), 400);

    // an empty body is still held to the consumed types
    let empty = HttpRequest::new("POST", "/users")
        .with_content(ContentPart::empty().with_header("Content-Type", "application/xml"))
        .with_principal(Principal::new("root"));
    let err = dispatcher().handle(empty).unwrap_err();
    assert!(matches!(err, Error::InvalidContentType(_)));
}

#[test]
fn test_typed_body_is_decoded_and_roles_are_checked() {
    let anonymous = json_post("/users", r#"{"id":3,"name":"Cy"}"#);
    let err = dispatcher().handle(anonymous).unwrap_err();
    assert!(matches!(err, Error::Http { status: 403, .. }));

    let dispatcher = dispatcher();
    let admin = json_post("/users", r#"{"id":3,"name":"Cy"}"#).with_principal(Principal::new("root"));
    let response = dispatcher.handle(admin).unwrap().unwrap();
    let user: User = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(user.name, "Cy");

    let listed = dispatcher.handle(request("GET", "/users/count")).unwrap().unwrap();
    assert_eq!(body(&listed), "4");
}

#[test]
fn test_empty_and_unreadable_bodies() {
    let err = dispatcher().handle(json_post("/users", "")).unwrap_err();
    assert!(matches!(err, Error::MissingParameter(_)));

    let err = dispatcher().handle(json_post("/users", "{not json")).unwrap_err();
    assert!(matches!(err, Error::UnreadableBody(_)));
}

#[test]
fn test_raw_parameters() {
    let req = HttpRequest::new("POST", "/users/5/raw").with_content(
        ContentPart::empty()
            .with_header("X-Trace", "abc")
            .with_header("Content-Type", "application/octet-stream")
            .with_body(vec![0u8; 16]),
    );
    let response = dispatcher().handle(req).unwrap().unwrap();
    assert_eq!(body(&response), "5 POST 2 16");
    assert_eq!(response.content_type(), Some("application/json"));
}

#[test]
fn test_form_parameters() {
    let form = ContentPart::empty()
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("id=12&name=Dee+Dee")
        .parse_form()
        .unwrap();
    let response = dispatcher()
        .handle(HttpRequest::new("POST", "/users/form").with_content(form))
        .unwrap()
        .unwrap();
    assert_eq!(body(&response), "12=Dee Dee");
}

#[test]
fn test_form_values_ignored_for_other_content_types() {
    let relabelled = ContentPart::empty()
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("id=12&name=Dee+Dee")
        .parse_form()
        .unwrap()
        .with_header("Content-Type", "application/json");
    let err = dispatcher()
        .handle(HttpRequest::new("POST", "/users/form").with_content(relabelled))
        .unwrap_err();
    assert!(matches!(err, Error::MissingFormParameters(_)));
}

#[test]
fn test_unparsed_and_multipart_forms_are_rejected() {
    let unparsed = HttpRequest::new("POST", "/users/form").with_content(
        ContentPart::empty()
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("id=12"),
    );
    let err = dispatcher().handle(unparsed).unwrap_err();
    assert!(matches!(err, Error::MalformedFormRequest(_)));
    assert_eq!(err.status_code(), 500);

    let multipart = HttpRequest::new("POST", "/users/form").with_content(
        ContentPart::empty()
            .with_header("Content-Type", "multipart/form-data; boundary=xyz")
            .with_body("--xyz--"),
    );
    let err = dispatcher().handle(multipart).unwrap_err();
    assert!(matches!(err, Error::NotImplemented(ref m) if m.contains("Multipart")));
}

#[test]
fn test_form_parameter_without_form() {
    let err = dispatcher().handle(json_post("/users/form", "{}")).unwrap_err();
    assert!(matches!(err, Error::MissingFormParameters(_)));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_unit_reply_is_empty() {
    let dispatcher = dispatcher();
    let response = dispatcher.handle(request("DELETE", "/users/7")).unwrap().unwrap();
    assert_eq!(response.status, 200);
    assert!(response.body.is_empty());

    let err = dispatcher.handle(request("GET", "/users/7")).unwrap_err();
    assert!(matches!(err, Error::Http { status: 404, .. }));
}

#[test]
fn test_security_view() {
    let req = HttpRequest::new("GET", "/users/whoami")
        .with_content(ContentPart::empty().with_header("X-Authentication-Scheme", "BASIC"))
        .with_principal(Principal::new("root"))
        .with_secure(true);
    let response = dispatcher().handle(req).unwrap().unwrap();
    assert_eq!(body(&response), "root admin=true secure=true scheme=BASIC");

    let response = dispatcher().handle(request("GET", "/users/whoami")).unwrap().unwrap();
    assert_eq!(body(&response), "anonymous admin=false secure=false scheme=none");
}

#[test]
fn test_handler_failures() {
    let dispatcher = dispatcher();

    let err = dispatcher.handle(request("GET", "/users/fail/io")).unwrap_err();
    match err {
        Error::Internal { message, source } => {
            assert_eq!(message, "disk gone");
            assert!(source.is_some());
        }
        other => panic!("unexpected error {:?}", other),
    }

    let err = dispatcher.handle(request("GET", "/users/fail/nested")).unwrap_err();
    assert!(matches!(err, Error::Http { status: 409, .. }));

    let err = dispatcher.handle(request("GET", "/users/fail/panic")).unwrap_err();
    assert!(matches!(err, Error::Internal { ref message, .. } if message == "exploded"));
}

#[test]
fn test_missing_context_object_fails_creation() {
    let dispatcher = Dispatcher::<Users>::builder().build().unwrap();
    let err = dispatcher.handle(request("GET", "/users/7")).unwrap_err();
    assert!(matches!(err, Error::Internal { .. }));
}

#[test]
fn test_dispatchers_from_same_resource_answer_identically() {
    let first = dispatcher();
    let second = dispatcher();

    for target in ["/users", "/users/1", "/users/search?q=A", "/users/count", "/users/9"] {
        let a = first.handle(request("GET", target)).unwrap();
        let b = second.handle(request("GET", target)).unwrap();
        assert_eq!(a, b, "responses differ for {}", target);
    }
}

#[test]
fn test_duplicate_operation_names_are_rejected() {
    let result = Dispatcher::<Users>::builder()
        .operations(vec![
            Operation::get("/a").name("same").handler(Users::count),
            Operation::get("/b").name("same").handler(Users::count),
        ])
        .build();
    assert!(matches!(result, Err(Error::InvalidRoute(_))));
}

struct Health;

#[derive(Serialize)]
struct Status {
    ok: bool,
}

impl Resource for Health {
    fn path() -> Option<&'static str> {
        Some("health")
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![Operation::at_root(HttpMethod::GET)
            .handler(|_: &Health, _: Arguments| Ok::<_, Error>(Entity(Status { ok: true })))]
    }

    fn create(_ctx: &RequestContext) -> Result<Self, Error> {
        Ok(Health)
    }
}

#[test]
fn test_media_defaults() {
    let plain = Dispatcher::<Health>::builder().build().unwrap();
    let response = plain.handle(request("GET", "/health")).unwrap().unwrap();
    assert_eq!(response.content_type(), Some("application/xml"));

    let config = DispatcherConfig::from_toml_str(
        r#"
        base_path = "/svc"
        default_produces = ["application/json"]
        "#,
    )
    .unwrap();
    let configured = Dispatcher::<Health>::builder().config(&config).build().unwrap();
    let response = configured.handle(request("GET", "/svc/health")).unwrap().unwrap();
    assert_eq!(response.content_type(), Some("application/json"));
    assert_eq!(body(&response), r#"{"ok":true}"#);
}

#[test]
fn test_shorthand_constructor() {
    let objects = keystone_core::ContextObjects::new().with(Directory::seeded());
    let roles: Arc<dyn RoleHandler> = Arc::new(Admins);
    let dispatcher = Dispatcher::<Users>::new("/", Some(roles), objects).unwrap();
    assert_eq!(dispatcher.routes().len(), 13);
    assert!(dispatcher.handle(request("GET", "/users/1")).unwrap().is_some());
}
