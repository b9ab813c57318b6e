use std::{fs, path::PathBuf, str::FromStr};

use clap::Parser;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};

/// Mint a signed JWT for exercising the authorizer locally.
///
/// - Signs with an RSA or EC private key in PEM (PKCS#8)
/// - Sets kid so the authorizer can find the key in its JWKS
/// - iat/exp are relative to now so expired and future-issued tokens are one flag away
#[derive(Parser, Debug)]
#[command(name = "token-gen", version, about)]
struct Args {
    /// Path to the signing private key in PEM (PKCS#8)
    #[arg(long, value_name = "FILE")]
    private_pem: PathBuf,

    /// Key id published in the JWKS
    #[arg(long)]
    kid: String,

    /// Signing algorithm (RS256, RS384, RS512, PS256, ES256, ES384)
    #[arg(long, default_value = "RS256")]
    alg: String,

    #[arg(long)]
    issuer: String,

    /// Repeat for a multi-valued aud
    #[arg(long)]
    audience: Vec<String>,

    #[arg(long, default_value = "user-123")]
    sub: String,

    /// exp = now + ttl (negative for an already expired token)
    #[arg(long, default_value_t = 3600, allow_hyphen_values = true)]
    ttl_seconds: i64,

    /// iat = now + offset (positive for a token issued in the future)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    iat_offset_seconds: i64,

    /// Extra claims as key=value; values are parsed as JSON when possible
    #[arg(long = "claim", value_name = "KEY=VALUE")]
    claims: Vec<String>,

    /// Print the decoded header and claims after the token
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn parse_claim(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("claim must be KEY=VALUE: {raw}"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn encoding_key(alg: Algorithm, pem: &[u8]) -> Result<EncodingKey, jsonwebtoken::errors::Error> {
    match alg {
        Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(pem),
        _ => EncodingKey::from_rsa_pem(pem),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let alg = Algorithm::from_str(&args.alg)?;
    if !matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
            | Algorithm::ES256
            | Algorithm::ES384
    ) {
        return Err(format!("unsupported signing algorithm: {}", args.alg).into());
    }

    let pem = fs::read(&args.private_pem)?;
    let key = encoding_key(alg, &pem)?;

    let now = chrono::Utc::now().timestamp();
    let iat = now + args.iat_offset_seconds;
    let exp = now + args.ttl_seconds;

    let mut claims = Map::new();
    claims.insert("iss".into(), Value::String(args.issuer));
    claims.insert("sub".into(), Value::String(args.sub));
    match args.audience.as_slice() {
        [] => {}
        [one] => {
            claims.insert("aud".into(), Value::String(one.clone()));
        }
        many => {
            claims.insert(
                "aud".into(),
                Value::Array(many.iter().cloned().map(Value::String).collect()),
            );
        }
    }
    claims.insert("iat".into(), Value::Number(iat.into()));
    claims.insert("exp".into(), Value::Number(exp.into()));
    for raw in &args.claims {
        let (name, value) = parse_claim(raw)?;
        claims.insert(name, value);
    }

    let mut header = Header::new(alg);
    header.kid = Some(args.kid);

    let claims = Value::Object(claims);
    let token = jsonwebtoken::encode(&header, &claims, &key)?;

    println!("{}", token);
    if args.verbose {
        eprintln!("header: {}", serde_json::to_string(&header)?);
        eprintln!("claims: {}", serde_json::to_string_pretty(&claims)?);
    }

    Ok(())
}
