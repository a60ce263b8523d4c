use actix_cors::Cors;
use actix_web::{
    dev::Server, http::header, http::Method, middleware, web, App,
    HttpRequest, HttpResponse, HttpServer,
};

use crate::{
    configuration::{AppState, State},
    controller::{messages, search, subscribers, subscriptions, version},
    error::Error,
};

pub async fn server_task(app_state: &AppState<State>) -> Result<(), Error> {
    let app = app_state.clone();
    tokio::spawn(async move {
        let server = init_server(app)?;
        server.await?;
        Ok(())
    })
    .await?
}

fn init_server(app_state: AppState<State>) -> Result<Server, Error> {
    let host = app_state.config.server_host.to_owned();
    let port = app_state.config.port;

    let server = HttpServer::new(move || {
        let app = app_state.clone();
        let allowed_cors = String::from("*");
        let cors_access_all =
            app.config.allowed_origins.contains(&allowed_cors);
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                if cors_access_all {
                    return true;
                }
                let allowed = &app.config.allowed_origins;
                if let Ok(origin) = origin.to_str() {
                    return allowed.contains(&origin.to_owned());
                }
                false
            })
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_header(header::CONTENT_TYPE)
            .allowed_header("x-admin-token")
            .max_age(86400);

        App::new()
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(4096))
            .service(
                web::scope("/api")
                    .service(subscribers::post_index)
                    .service(subscribers::get_index)
                    .service(subscriptions::post_index)
                    .service(subscriptions::delete_index)
                    .service(messages::get_index)
                    .service(messages::post_index)
                    .service(search::index)
                    .service(version::index)
                    .service(
                        web::resource("/subscribers")
                            .route(web::route().to(method_fallback)),
                    )
                    .service(
                        web::resource("/subscriptions")
                            .route(web::route().to(method_fallback)),
                    )
                    .service(
                        web::resource("/messages")
                            .route(web::route().to(method_fallback)),
                    )
                    .service(
                        web::resource("/search")
                            .route(web::route().to(method_fallback)),
                    )
                    .service(
                        web::resource("/version")
                            .route(web::route().to(method_fallback)),
                    ),
            )
    })
    .bind((host, port))?
    .disable_signals()
    .run();
    Ok(server)
}

/// Catch-all for the resource paths. Stray preflights get an empty 200,
/// anything else that reached here is an unsupported method.
async fn method_fallback(req: HttpRequest) -> Result<HttpResponse, Error> {
    if req.method() == Method::OPTIONS {
        return Ok(HttpResponse::Ok().finish());
    }

    Err(Error::MethodNotAllowed())
}
