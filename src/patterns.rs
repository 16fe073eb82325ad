// src/patterns.rs - Named-capture patterns and the built-in access log layouts
use crate::error::ConfigError;
use crate::input_format::Record;
use once_cell::sync::Lazy;
use regex::Regex;

/// A validated regular expression whose capture groups are all named.
///
/// The pattern always has to match the whole line, so it is stored
/// wrapped as `^(?:pattern)$`.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let unanchored = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        // Index 0 is the implicit whole-match group
        let groups: Vec<Option<&str>> = unanchored.capture_names().skip(1).collect();
        if !groups.iter().any(|name| name.is_some()) {
            return Err(ConfigError::NoCaptureGroup(pattern.to_string()));
        }
        if groups.iter().any(|name| name.is_none()) {
            return Err(ConfigError::UnnamedGroup(pattern.to_string()));
        }
        let names = groups
            .into_iter()
            .flatten()
            .map(|name| name.to_string())
            .collect();

        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Pattern {
            source: pattern.to_string(),
            regex,
            names,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Capture names in declaration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Match the full line and build a record from the named groups.
    pub fn decode(&self, line: &str) -> Option<Record> {
        let captures = self.regex.captures(line)?;
        let values = self
            .names
            .iter()
            .map(|name| {
                captures
                    .name(name)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            })
            .collect();
        Some(Record::new(self.names.clone(), values))
    }
}

/// Ordered patterns; the first one that matches a line wins.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from patterns given in priority order.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let mut set = PatternSet::new();
        set.add_all(patterns)?;
        Ok(set)
    }

    pub fn validate_and_add(&mut self, pattern: &str) -> Result<(), ConfigError> {
        let pattern = Pattern::new(pattern)?;
        self.patterns.push(pattern);
        Ok(())
    }

    /// Add every pattern or none of them.
    ///
    /// The whole batch is validated before anything is appended. If any
    /// pattern is invalid the set is left empty, including patterns that
    /// were registered before this call.
    pub fn add_all<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<(), ConfigError> {
        let mut staged = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match Pattern::new(pattern.as_ref()) {
                Ok(compiled) => staged.push(compiled),
                Err(e) => {
                    self.patterns.clear();
                    return Err(e);
                }
            }
        }
        self.patterns.extend(staged);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Union of all capture names, in the order they are first declared.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for pattern in &self.patterns {
            for name in pattern.names() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Try each pattern top to bottom.
    pub fn decode(&self, line: &str) -> Option<Record> {
        self.patterns.iter().find_map(|pattern| pattern.decode(line))
    }
}

/// A log layout: field fragments joined by a separator. Formats that
/// gained fields over the years list the field counts of their older
/// revisions in `revisions`, newest first.
struct Layout {
    separator: &'static str,
    fields: &'static [&'static str],
    revisions: &'static [usize],
    trailer: &'static str,
}

impl Layout {
    fn patterns(&self) -> Vec<String> {
        self.revisions
            .iter()
            .map(|&count| {
                let mut pattern = self.fields[..count].join(self.separator);
                pattern.push_str(self.trailer);
                pattern
            })
            .collect()
    }

    fn build(&self) -> PatternSet {
        PatternSet::from_patterns(&self.patterns()).expect("built-in layout patterns are valid")
    }
}

const REQUEST: &str = r#""(?P<method>\S+) (?P<request_uri>\S+) (?P<protocol>[^"]*)""#;

const S3_LAYOUT: Layout = Layout {
    separator: " ",
    fields: &[
        r"(?P<bucket_owner>\S+)",
        r"(?P<bucket>\S+)",
        r"\[(?P<time>[^\]]+)\]",
        r"(?P<remote_ip>\S+)",
        r"(?P<requester>\S+)",
        r"(?P<request_id>\S+)",
        r"(?P<operation>\S+)",
        r"(?P<key>\S+)",
        r#""(?P<request_uri>[^"]*)""#,
        r"(?P<http_status>\S+)",
        r"(?P<error_code>\S+)",
        r"(?P<bytes_sent>\S+)",
        r"(?P<object_size>\S+)",
        r"(?P<total_time>\S+)",
        r"(?P<turn_around_time>\S+)",
        r#""(?P<referer>[^"]*)""#,
        r#""(?P<user_agent>[^"]*)""#,
        r"(?P<version_id>\S+)",
        r"(?P<host_id>\S+)",
        r"(?P<signature_version>\S+)",
        r"(?P<cipher_suite>\S+)",
        r"(?P<authentication_type>\S+)",
        r"(?P<host_header>\S+)",
        r"(?P<tls_version>\S+)",
        r"(?P<access_point_arn>\S+)",
        r"(?P<acl_required>\S+)",
    ],
    revisions: &[26, 25, 24, 23, 18],
    trailer: "",
};

const CLOUDFRONT_LAYOUT: Layout = Layout {
    separator: "\t",
    fields: &[
        r"(?P<date>[^\t]*)",
        r"(?P<time>[^\t]*)",
        r"(?P<x_edge_location>[^\t]*)",
        r"(?P<sc_bytes>[^\t]*)",
        r"(?P<c_ip>[^\t]*)",
        r"(?P<cs_method>[^\t]*)",
        r"(?P<cs_host>[^\t]*)",
        r"(?P<cs_uri_stem>[^\t]*)",
        r"(?P<sc_status>[^\t]*)",
        r"(?P<cs_referer>[^\t]*)",
        r"(?P<cs_user_agent>[^\t]*)",
        r"(?P<cs_uri_query>[^\t]*)",
        r"(?P<cs_cookie>[^\t]*)",
        r"(?P<x_edge_result_type>[^\t]*)",
        r"(?P<x_edge_request_id>[^\t]*)",
        r"(?P<x_host_header>[^\t]*)",
        r"(?P<cs_protocol>[^\t]*)",
        r"(?P<cs_bytes>[^\t]*)",
        r"(?P<time_taken>[^\t]*)",
        r"(?P<x_forwarded_for>[^\t]*)",
        r"(?P<ssl_protocol>[^\t]*)",
        r"(?P<ssl_cipher>[^\t]*)",
        r"(?P<x_edge_response_result_type>[^\t]*)",
        r"(?P<cs_protocol_version>[^\t]*)",
        r"(?P<fle_status>[^\t]*)",
        r"(?P<fle_encrypted_fields>[^\t]*)",
        r"(?P<c_port>[^\t]*)",
        r"(?P<time_to_first_byte>[^\t]*)",
        r"(?P<x_edge_detailed_result_type>[^\t]*)",
        r"(?P<sc_content_type>[^\t]*)",
        r"(?P<sc_content_len>[^\t]*)",
        r"(?P<sc_range_start>[^\t]*)",
        r"(?P<sc_range_end>[^\t]*)",
    ],
    revisions: &[33, 28, 26, 24],
    trailer: "",
};

const ALB_LAYOUT: Layout = Layout {
    separator: " ",
    fields: &[
        r"(?P<type>\S+)",
        r"(?P<time>\S+)",
        r"(?P<elb>\S+)",
        r"(?P<client_port>\S+)",
        r"(?P<target_port>\S+)",
        r"(?P<request_processing_time>\S+)",
        r"(?P<target_processing_time>\S+)",
        r"(?P<response_processing_time>\S+)",
        r"(?P<elb_status_code>\S+)",
        r"(?P<target_status_code>\S+)",
        r"(?P<received_bytes>\S+)",
        r"(?P<sent_bytes>\S+)",
        REQUEST,
        r#""(?P<user_agent>[^"]*)""#,
        r"(?P<ssl_cipher>\S+)",
        r"(?P<ssl_protocol>\S+)",
        r"(?P<target_group_arn>\S+)",
        r#""(?P<trace_id>[^"]*)""#,
        r#""(?P<domain_name>[^"]*)""#,
        r#""(?P<chosen_cert_arn>[^"]*)""#,
        r"(?P<matched_rule_priority>\S+)",
        r"(?P<request_creation_time>\S+)",
        r#""(?P<actions_executed>[^"]*)""#,
        r#""(?P<redirect_url>[^"]*)""#,
        r#""(?P<error_reason>[^"]*)""#,
        r#""(?P<target_port_list>[^"]*)""#,
        r#""(?P<target_status_code_list>[^"]*)""#,
        r#""(?P<classification>[^"]*)""#,
        r#""(?P<classification_reason>[^"]*)""#,
        r"(?P<conn_trace_id>\S+)",
    ],
    revisions: &[30, 29, 27, 25, 22],
    trailer: "",
};

const NLB_LAYOUT: Layout = Layout {
    separator: " ",
    fields: &[
        r"(?P<type>\S+)",
        r"(?P<version>\S+)",
        r"(?P<time>\S+)",
        r"(?P<elb>\S+)",
        r"(?P<listener>\S+)",
        r"(?P<client_port>\S+)",
        r"(?P<destination_port>\S+)",
        r"(?P<connection_time>\S+)",
        r"(?P<tls_handshake_time>\S+)",
        r"(?P<received_bytes>\S+)",
        r"(?P<sent_bytes>\S+)",
        r"(?P<incoming_tls_alert>\S+)",
        r"(?P<chosen_cert_arn>\S+)",
        r"(?P<chosen_cert_serial>\S+)",
        r"(?P<tls_cipher>\S+)",
        r"(?P<tls_protocol_version>\S+)",
        r"(?P<tls_named_group>\S+)",
        r"(?P<domain_name>\S+)",
        r"(?P<alpn_fe_protocol>\S+)",
        r"(?P<alpn_be_protocol>\S+)",
        r"(?P<alpn_client_preference_list>\S+)",
        r"(?P<tls_connection_creation_time>\S+)",
    ],
    revisions: &[22, 18],
    trailer: "",
};

const CLB_LAYOUT: Layout = Layout {
    separator: " ",
    fields: &[
        r"(?P<time>\S+)",
        r"(?P<elb>\S+)",
        r"(?P<client_port>\S+)",
        r"(?P<backend_port>\S+)",
        r"(?P<request_processing_time>\S+)",
        r"(?P<backend_processing_time>\S+)",
        r"(?P<response_processing_time>\S+)",
        r"(?P<elb_status_code>\S+)",
        r"(?P<backend_status_code>\S+)",
        r"(?P<received_bytes>\S+)",
        r"(?P<sent_bytes>\S+)",
        REQUEST,
        r#""(?P<user_agent>[^"]*)""#,
        r"(?P<ssl_cipher>\S+)",
        r"(?P<ssl_protocol>\S+)",
    ],
    revisions: &[15, 12],
    trailer: "",
};

const APACHE_FIELDS: &[&str] = &[
    r"(?P<remote_host>\S+)",
    r"(?P<remote_logname>\S+)",
    r"(?P<remote_user>\S+)",
    r"\[(?P<datetime>[^\]]+)\]",
    REQUEST,
    r"(?P<status>\d{3})",
    r"(?P<size>\d+|-)",
    r#""(?P<referer>[^"]*)""#,
    r#""(?P<user_agent>[^"]*)""#,
];

// Common Log Format; anything after the size column is ignored
const APACHE_LAYOUT: Layout = Layout {
    separator: " ",
    fields: APACHE_FIELDS,
    revisions: &[7],
    trailer: r"(?: .*)?",
};

const APACHE_COMBINED_LAYOUT: Layout = Layout {
    separator: " ",
    fields: APACHE_FIELDS,
    revisions: &[9, 7],
    trailer: "",
};

static S3: Lazy<PatternSet> = Lazy::new(|| S3_LAYOUT.build());
static CLOUDFRONT: Lazy<PatternSet> = Lazy::new(|| CLOUDFRONT_LAYOUT.build());
static ALB: Lazy<PatternSet> = Lazy::new(|| ALB_LAYOUT.build());
static NLB: Lazy<PatternSet> = Lazy::new(|| NLB_LAYOUT.build());
static CLB: Lazy<PatternSet> = Lazy::new(|| CLB_LAYOUT.build());
static APACHE: Lazy<PatternSet> = Lazy::new(|| APACHE_LAYOUT.build());
static APACHE_COMBINED: Lazy<PatternSet> = Lazy::new(|| APACHE_COMBINED_LAYOUT.build());

/// Amazon S3 server access logs
pub fn s3() -> &'static PatternSet {
    &S3
}

/// Amazon CloudFront standard logs (tab separated)
pub fn cloudfront() -> &'static PatternSet {
    &CLOUDFRONT
}

/// Application Load Balancer
pub fn alb() -> &'static PatternSet {
    &ALB
}

/// Network Load Balancer (TLS listeners)
pub fn nlb() -> &'static PatternSet {
    &NLB
}

/// Classic Load Balancer
pub fn clb() -> &'static PatternSet {
    &CLB
}

/// Apache Common Log Format
pub fn apache() -> &'static PatternSet {
    &APACHE
}

/// Apache Combined Log Format, falling back to the common format
pub fn apache_combined() -> &'static PatternSet {
    &APACHE_COMBINED
}
