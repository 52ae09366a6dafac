use std::sync::Arc;

use async_channel::Sender;
use diesel::{
    PgConnection,
    r2d2::{ConnectionManager, Pool},
};
use provider_gateway::registry::ProviderRegistry;
use reqwest::Method;
use salvo::{
    catcher::Catcher,
    cors::{Any, Cors},
    oapi::{
        Info, License, SecurityRequirement, SecurityScheme,
        security::{Http, HttpAuthScheme},
    },
    prelude::*,
    rate_limiter::{BasicQuota, FixedGuard, MokaStore, RateLimiter, RemoteIpIssuer},
};

use crate::{
    core::{
        database::db::establish_connection,
        env::app_env::AppEnv,
        utils::{jwt_utils::JwtUtils, wx_utils::WxClient},
    },
    features::{
        auth::{repository::UserRepositoryImpl, router::get_auth_router, service::AuthServiceImpl},
        meeting::{
            repository::MeetingRepositoryImpl,
            router::{get_collection_router, get_meeting_router},
            service::MeetingServiceImpl,
        },
        notify::{
            dispatcher::{NotifyEvent, spawn_dispatcher},
            email::EmailSender,
        },
    },
};

#[endpoint(tags("system"))]
async fn health_check(res: &mut Response) {
    res.render("[v1] Community Meeting Service");
}

#[handler]
async fn set_services(depot: &mut Depot) {
    let pool = depot.obtain::<DbConnection>().unwrap();
    let env = depot.obtain::<AppEnv>().unwrap();
    let registry = depot.obtain::<Arc<ProviderRegistry>>().unwrap();
    let notify_sender = depot.obtain::<Sender<NotifyEvent>>().unwrap();

    let user_repository = UserRepositoryImpl::new(pool.clone().0);
    let meeting_repository = MeetingRepositoryImpl::new(pool.clone().0);

    let auth_service = AuthServiceImpl::new(user_repository.clone());
    let meeting_service = MeetingServiceImpl::new(
        meeting_repository,
        user_repository,
        registry.clone(),
        env.meeting_hosts.clone(),
        notify_sender.clone(),
        env.community.clone(),
        env.timezone.clone(),
    );

    depot.inject(auth_service);
    depot.inject(meeting_service);
}

pub async fn get_salvo_service(env: &AppEnv) -> Service {
    let pool = establish_connection(env.clone());

    let db_pooled_connection = DbConnection(pool.clone());
    let jwt_utils = JwtUtils::new(env.clone());

    let registry = Arc::new(
        ProviderRegistry::new(env.gateway_config()).expect("Failed to build provider gateway"),
    );
    let wx_client = WxClient::new(env.wechat.clone()).expect("Failed to build wechat client");
    let mailer = EmailSender::new(env.smtp.clone());

    let (notify_sender, notify_receiver) = async_channel::unbounded::<NotifyEvent>();
    spawn_dispatcher(notify_receiver, mailer, wx_client.clone());

    let limiter = RateLimiter::new(
        FixedGuard::new(),
        MokaStore::new(),
        RemoteIpIssuer,
        BasicQuota::per_second(200),
    );

    let health_router = Router::new().path("/health-check").get(health_check);
    let auth_router = get_auth_router(jwt_utils.clone());
    let meeting_router = get_meeting_router(jwt_utils.clone());
    let collection_router = get_collection_router(jwt_utils.clone());

    let cors = Cors::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers(vec!["Authorization", "Content-Type"])
        .into_handler();

    let router = Router::with_path("meetapi/v1")
        .hoop(Logger::new())
        .hoop(affix_state::inject(db_pooled_connection))
        .hoop(affix_state::inject(jwt_utils))
        .hoop(affix_state::inject(env.clone()))
        .hoop(affix_state::inject(notify_sender))
        .hoop(affix_state::inject(registry))
        .hoop(affix_state::inject(wx_client))
        .hoop(CatchPanic::new())
        .hoop(CachingHeaders::new())
        .hoop(Compression::new().min_length(1024))
        .hoop(limiter)
        .hoop(set_services)
        .push(auth_router)
        .push(meeting_router)
        .push(collection_router)
        .push(health_router);

    // Config
    let doc_info = Info::new("[v1] Community Meeting Service API", "1.0.0")
        .description(
            "Schedules community meetings across Zoom, WeLink and Tencent Meeting, \
             with mail and subscription-message notifications.",
        )
        .license(License::new("Apache-2.0"));
    let http_auth_schema = Http::new(HttpAuthScheme::Bearer)
        .bearer_format("JWT")
        .description("jsonwebtoken");
    let security_scheme = SecurityScheme::Http(http_auth_schema);
    let security_requirement = SecurityRequirement::new("BearerAuth", ["*"]);
    let doc = OpenApi::new("[v1] Community Meeting Service API", "1.0.0")
        .info(doc_info)
        .add_security_scheme("BearerAuth", security_scheme)
        .security([security_requirement])
        .merge_router(&router);

    let router = Router::new()
        .push(doc.into_router("/api-doc/openapi.json"))
        .push(SwaggerUi::new("/api-doc/openapi.json").into_router("docs"))
        .push(router);

    Service::new(router)
        .hoop(cors)
        .catcher(Catcher::default().hoop(handle404))
}

#[handler]
async fn handle404(res: &mut Response, ctrl: &mut FlowCtrl) {
    if StatusCode::NOT_FOUND == res.status_code.unwrap_or(StatusCode::NOT_FOUND) {
        res.render("[v1] Not Found");
        ctrl.skip_rest();
    }
}

#[derive(Debug, Clone)]
pub struct DbConnection(pub Pool<ConnectionManager<PgConnection>>);
