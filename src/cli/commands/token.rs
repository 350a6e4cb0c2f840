use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::auth::{generate_jwt, Claims, RoleClaim};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(help = "User id placed in the token subject")]
    pub user: String,

    #[arg(long, help = "Display name (defaults to the user id)")]
    pub name: Option<String>,

    #[arg(long = "role", help = "Role entry; repeat to add more, order is kept")]
    pub roles: Vec<String>,

    #[arg(long, help = "Token lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
    pub expiry_hours: Option<u64>,
}

pub async fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config::config().security;
    if security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET is not set");
    }

    let expiry_hours = args.expiry_hours.unwrap_or(security.jwt_expiry_hours);
    let name = args.name.unwrap_or_else(|| args.user.clone());
    let roles: Vec<RoleClaim> = args.roles.into_iter().map(RoleClaim::new).collect();
    let claims = Claims::new(args.user, name, roles, expiry_hours);

    let token = generate_jwt(&claims, &security.jwt_secret).context("failed to sign token")?;

    match output_format {
        OutputFormat::Json => {
            let out = json!({
                "token": token,
                "sub": claims.sub,
                "name": claims.name,
                "roles": claims.roles,
                "exp": claims.exp,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
