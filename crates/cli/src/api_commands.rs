use std::path::PathBuf;

use {
    anyhow::{Context, Result, bail},
    clap::{Subcommand, ValueEnum},
    secrecy::ExposeSecret,
    wxmp_config::WxmpConfig,
    wxmp_sdk::{Client, MaterialKind, Menu, MiniProgramCard, OAuthScope, TemplateMessage},
};

#[derive(Subcommand)]
pub enum ApiCommand {
    /// Fetch an access token and print it with its lifetime.
    Token,
    /// List follower OpenIDs.
    Users {
        /// Start after this OpenID (one page only).
        #[arg(long, conflicts_with = "all")]
        next: Option<String>,
        /// Follow the cursor through every page.
        #[arg(long)]
        all: bool,
    },
    /// Print a follower's profile as JSON.
    UserInfo { openid: String },
    /// Send a customer-service text message.
    SendText {
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        message: String,
    },
    /// Send a customer-service mini program card.
    SendCard {
        #[arg(long)]
        to: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        appid: String,
        #[arg(long)]
        pagepath: String,
        #[arg(long)]
        thumb_media_id: String,
    },
    /// Send a template message.
    SendTemplate {
        #[arg(long)]
        to: String,
        #[arg(long)]
        template_id: String,
        /// Page opened when the message is tapped.
        #[arg(long)]
        url: Option<String>,
        /// Placeholder value as `key=value`; repeatable.
        #[arg(long = "field", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,
    },
    /// Replace the custom menu with the JSON menu in FILE.
    MenuCreate { file: PathBuf },
    /// Remove the custom menu.
    MenuDelete,
    /// Download a temporary media file.
    DownloadMedia {
        media_id: String,
        /// Write to this path instead of printing base64.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Upload the file at URL as permanent material.
    UploadMaterial {
        url: String,
        #[arg(long, value_enum, default_value_t = MaterialArg::Image)]
        kind: MaterialArg,
    },
    /// Print the web OAuth authorize URL.
    OauthUrl {
        redirect_uri: String,
        #[arg(long, value_enum, default_value_t = ScopeArg::Base)]
        scope: ScopeArg,
        #[arg(long, default_value = "")]
        state: String,
    },
    /// Exchange a web OAuth code for the user's OpenID and token.
    OauthExchange { code: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MaterialArg {
    Image,
    Voice,
    Video,
    Thumb,
}

impl From<MaterialArg> for MaterialKind {
    fn from(arg: MaterialArg) -> Self {
        match arg {
            MaterialArg::Image => Self::Image,
            MaterialArg::Voice => Self::Voice,
            MaterialArg::Video => Self::Video,
            MaterialArg::Thumb => Self::Thumb,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    Base,
    Userinfo,
}

impl From<ScopeArg> for OAuthScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Base => Self::Base,
            ScopeArg::Userinfo => Self::UserInfo,
        }
    }
}

pub(crate) fn parse_key_val(s: &str) -> Result<(String, String)> {
    let Some((key, value)) = s.split_once('=') else {
        bail!("expected key=value, got {s:?}");
    };
    if key.is_empty() {
        bail!("empty key in {s:?}");
    }
    Ok((key.to_string(), value.to_string()))
}

impl ApiCommand {
    /// Commands that call the API with the account access token.
    fn needs_account_token(&self) -> bool {
        !matches!(
            self,
            Self::Token | Self::OauthUrl { .. } | Self::OauthExchange { .. }
        )
    }
}

pub async fn handle_api(command: ApiCommand, config: WxmpConfig) -> Result<()> {
    let needs_token = command.needs_account_token();
    let client = Client::builder(config.wechat)
        .auto_refresh(false)
        .build()
        .context("invalid account configuration")?;

    if let ApiCommand::Token = command {
        let resp = client.get_access_token().await?;
        println!("{}", resp.access_token.expose_secret());
        eprintln!("expires in {}s", resp.expires_in);
        return Ok(());
    }
    if needs_token {
        client.refresh_token().await?;
    }

    match command {
        ApiCommand::Token => {},
        ApiCommand::Users { next, all } => {
            if all {
                for openid in client.list_all_users().await? {
                    println!("{openid}");
                }
            } else {
                let page = client.list_users(next.as_deref()).await?;
                for openid in page.openids() {
                    println!("{openid}");
                }
                eprintln!(
                    "{} of {} followers, next cursor: {}",
                    page.count, page.total, page.next_openid
                );
            }
        },
        ApiCommand::UserInfo { openid } => {
            let info = client.get_user_info(&openid).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "openid": info.openid,
                    "subscribed": info.is_subscribed(),
                    "language": info.language,
                    "subscribe_time": info.subscribe_time,
                    "subscribe_scene": info.subscribe_scene,
                    "unionid": info.unionid,
                    "remark": info.remark,
                    "tagid_list": info.tagid_list,
                }))?
            );
        },
        ApiCommand::SendText { to, message } => {
            client.send_text(&to, &message).await?;
            eprintln!("sent");
        },
        ApiCommand::SendCard {
            to,
            title,
            appid,
            pagepath,
            thumb_media_id,
        } => {
            let card = MiniProgramCard {
                title,
                appid,
                pagepath,
                thumb_media_id,
            };
            client.send_mini_program_card(&to, &card).await?;
            eprintln!("sent");
        },
        ApiCommand::SendTemplate {
            to,
            template_id,
            url,
            fields,
        } => {
            let mut message = TemplateMessage::new(to, template_id).fields(fields);
            if let Some(url) = url {
                message = message.url(url);
            }
            match client.send_template(&message).await? {
                Some(msgid) => println!("{msgid}"),
                None => eprintln!("sent"),
            }
        },
        ApiCommand::MenuCreate { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let menu: Menu = serde_json::from_str(&raw)
                .with_context(|| format!("parsing menu {}", file.display()))?;
            client.create_menu(&menu).await?;
            eprintln!("menu updated");
        },
        ApiCommand::MenuDelete => {
            client.delete_menu().await?;
            eprintln!("menu deleted");
        },
        ApiCommand::DownloadMedia { media_id, out } => match out {
            Some(path) => {
                client.download_media(&media_id, &path).await?;
                eprintln!("saved {}", path.display());
            },
            None => println!("{}", client.download_media_base64(&media_id).await?),
        },
        ApiCommand::UploadMaterial { url, kind } => {
            let upload = client.add_material(kind.into(), &url).await?;
            println!("{}", upload.media_id);
            if let Some(url) = upload.url {
                eprintln!("url: {url}");
            }
        },
        ApiCommand::OauthUrl {
            redirect_uri,
            scope,
            state,
        } => println!("{}", client.authorize_url(&redirect_uri, scope.into(), &state)),
        ApiCommand::OauthExchange { code } => {
            let token = client.exchange_oauth_code(&code).await?;
            println!("{}", token.openid);
            eprintln!("scope: {}, expires in {}s", token.scope, token.expires_in);
        },
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_val_pairs() {
        assert_eq!(
            parse_key_val("first=Hello=World").unwrap(),
            ("first".to_string(), "Hello=World".to_string())
        );
        assert_eq!(
            parse_key_val("remark=").unwrap(),
            ("remark".to_string(), String::new())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn oauth_commands_skip_account_token() {
        let url = ApiCommand::OauthUrl {
            redirect_uri: "https://example.com".into(),
            scope: ScopeArg::Base,
            state: String::new(),
        };
        assert!(!url.needs_account_token());
        assert!(
            !ApiCommand::OauthExchange {
                code: "c1".into()
            }
            .needs_account_token()
        );
        assert!(ApiCommand::MenuDelete.needs_account_token());
    }

    #[tokio::test]
    async fn oauth_exchange_works_without_account_token() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("GET", "/cgi-bin/token")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"errcode":40001,"errmsg":"invalid credential"}"#)
            .expect(0)
            .create_async()
            .await;
        let exchange = server
            .mock("GET", "/sns/oauth2/access_token")
            .match_query(mockito::Matcher::UrlEncoded("code".into(), "c1".into()))
            .with_status(200)
            .with_body(
                r#"{"access_token":"W","expires_in":7200,"refresh_token":"R","openid":"o1","scope":"snsapi_base"}"#,
            )
            .create_async()
            .await;

        let config = WxmpConfig {
            wechat: wxmp_sdk::WechatConfig::new("wx1", "sec").with_api_base(server.url()),
            ..Default::default()
        };
        handle_api(
            ApiCommand::OauthExchange {
                code: "c1".into(),
            },
            config,
        )
        .await
        .unwrap();
        exchange.assert_async().await;
        token.assert_async().await;
    }
}
