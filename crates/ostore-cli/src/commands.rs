use std::path::Path;

use anyhow::{bail, Context};
use ostore_client::{Client, ClientError};
use ostore_server::{Config, OstoreServer};
use ostore_types::{ApiObject, ApiResponse, Object, User};

use crate::cli::*;
use crate::output::print_response;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let response = match cli.command {
        Command::Serve(args) => return cmd_serve(&cli.config, args),
        Command::Object(args) => cmd_object(&cli.config, args.action)?,
        Command::User(args) => cmd_user(&cli.config, args.action)?,
    };
    print_response(&cli.format, &response)
}

fn cmd_serve(config_path: &Path, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = Config::load(config_path)?;
    if let Some(bind) = args.bind {
        config.http.bind_addr = bind;
    }
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(OstoreServer::new(config).serve())?;
    Ok(())
}

/// Open the configured store with its index loaded.
fn open_client(config_path: &Path) -> anyhow::Result<Client> {
    let config = Config::load(config_path)?;
    let client = Client::new(config.client_config())?;
    client.sync()?;
    Ok(client)
}

/// `None` runs unchecked, as the operator.
fn acting_user(client: &Client, username: Option<&str>) -> anyhow::Result<Option<User>> {
    username
        .map(|name| {
            client
                .get_user_by_username(name)
                .with_context(|| format!("unknown user {name}"))
        })
        .transpose()
}

pub(crate) fn cmd_object(config_path: &Path, action: ObjectAction) -> anyhow::Result<ApiResponse> {
    let client = open_client(config_path)?;
    match action {
        ObjectAction::Get { uids, user } => {
            let user = acting_user(&client, user.as_deref())?;
            let objects = uids
                .iter()
                .map(|uid| Ok(ApiObject::from_object(&client.get(uid, user.as_ref())?)))
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(ApiResponse::ok().with_objects(objects))
        }
        ObjectAction::Set { data, user } => {
            let user = acting_user(&client, user.as_deref())?;
            let data = match data {
                Some(data) => data,
                None => std::io::read_to_string(std::io::stdin()).context("reading stdin")?,
            };
            let mut saved = Vec::new();
            for object in parse_objects(&data)? {
                let mut object = object.into_object()?;
                client.set(&mut object, user.as_ref())?;
                saved.push(ApiObject::from_object(&object));
            }
            client.sync()?;
            Ok(ApiResponse::ok().with_objects(saved))
        }
        ObjectAction::Delete { uids, user } => {
            let user = acting_user(&client, user.as_deref())?;
            for uid in uids {
                client.delete(&mut Object::with_uid(uid), user.as_ref())?;
            }
            client.sync()?;
            Ok(ApiResponse::ok())
        }
        ObjectAction::Query { expr, user } => {
            let user = acting_user(&client, user.as_deref())?;
            let objects = client
                .query(&expr.join(" "), user.as_ref())?
                .iter()
                .map(ApiObject::from_index)
                .collect();
            Ok(ApiResponse::ok().with_objects(objects))
        }
    }
}

/// Accept either one JSON object or an array of them.
fn parse_objects(data: &str) -> anyhow::Result<Vec<ApiObject>> {
    let value: serde_json::Value = serde_json::from_str(data).context("parsing object JSON")?;
    let objects = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ApiObject>, _>>()?,
        value @ serde_json::Value::Object(_) => vec![serde_json::from_value(value)?],
        _ => bail!("expected a JSON object or an array of objects"),
    };
    if objects.is_empty() {
        return Err(ClientError::MissingObject.into());
    }
    Ok(objects)
}

pub(crate) fn cmd_user(config_path: &Path, action: UserAction) -> anyhow::Result<ApiResponse> {
    let client = open_client(config_path)?;
    match action {
        UserAction::Set {
            username,
            password,
            groups,
            disable,
        } => {
            let mut user = match client.get_user_by_username(&username) {
                Ok(user) => user,
                Err(ClientError::NotFound(_)) => User::new(username),
                Err(e) => return Err(e.into()),
            };
            if !groups.is_empty() {
                user.groups = groups;
            }
            if let Some(password) = password {
                client.set_password(&mut user, &password)?;
            }
            user.active = !disable;
            client.set_user(&mut user)?;
            // A first save always activates.
            if disable && user.active {
                user.active = false;
                client.set_user(&mut user)?;
            }
            Ok(ApiResponse::ok().with_objects(vec![ApiObject::from_user(&user)]))
        }
        UserAction::Get(selector) => {
            let user = select_user(&client, &selector)?;
            Ok(ApiResponse::ok().with_objects(vec![ApiObject::from_user(&user)]))
        }
        UserAction::Delete(selector) => {
            let user = select_user(&client, &selector)?;
            client.delete_user(&user)?;
            Ok(ApiResponse {
                message: Some(format!("deleted user {}", user.username)),
                ..ApiResponse::ok()
            })
        }
    }
}

fn select_user(client: &Client, selector: &UserSelector) -> anyhow::Result<User> {
    let user = match (&selector.username, &selector.uid) {
        (Some(username), _) => client.get_user_by_username(username)?,
        (None, Some(uid)) => client.get_user(uid)?,
        (None, None) => bail!("either --username or --uid is required"),
    };
    Ok(user)
}
