//! Provider tests with HTTP mocking.

mod cloudflare_tests {
    use crate::providers::{CloudflareAuth, CloudflareProvider, DnsProvider, Record};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, auth: CloudflareAuth) -> CloudflareProvider {
        CloudflareProvider::with_base_url(reqwest::Client::new(), auth, "A", server.uri())
    }

    async fn mount_zone(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/client/v4/zones"))
            .and(query_param("name", "example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": [{ "id": "zone123", "name": "example.com" }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_cloudflare_list_records() {
        let server = MockServer::start().await;
        mount_zone(&server).await;

        Mock::given(method("GET"))
            .and(path("/client/v4/zones/zone123/dns_records"))
            .and(query_param("type", "A"))
            .and(query_param("per_page", "500"))
            .and(header("Authorization", "Bearer cf-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": [
                    { "id": "rec1", "name": "home.example.com", "content": "1.2.3.4", "type": "A" },
                    { "id": "rec2", "name": "www.example.com", "content": "1.2.3.4", "type": "A" }
                ]
            })))
            .mount(&server)
            .await;

        let cf = provider(&server, CloudflareAuth::Token("cf-token".to_string()));
        let records = cf.list_records("example.com").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "rec1");
        assert_eq!(records[0].name, "home.example.com");
        assert_eq!(records[0].value, "1.2.3.4");
        assert_eq!(records[0].zone_id.as_deref(), Some("zone123"));
        assert_eq!(records[1].label(), "www");
    }

    #[tokio::test]
    async fn test_cloudflare_global_key_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/client/v4/zones"))
            .and(header("X-Auth-Email", "me@example.com"))
            .and(header("X-Auth-Key", "global-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cf = provider(
            &server,
            CloudflareAuth::Key {
                email: "me@example.com".to_string(),
                key: "global-key".to_string(),
            },
        );
        let err = cf.list_records("example.com").await.unwrap_err();
        assert!(err.to_string().contains("Zone example.com not found"));
    }

    #[tokio::test]
    async fn test_cloudflare_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/client/v4/zones"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "errors": [{ "code": 9109, "message": "Invalid access token" }],
                "result": null
            })))
            .mount(&server)
            .await;

        let cf = provider(&server, CloudflareAuth::Token("bad".to_string()));
        let err = cf.list_records("example.com").await.unwrap_err();
        assert!(err.to_string().contains("Invalid access token"));
    }

    #[tokio::test]
    async fn test_cloudflare_update_record() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/client/v4/zones/zone123/dns_records/rec1"))
            .and(body_json(json!({
                "type": "A",
                "name": "home.example.com",
                "content": "5.6.7.8"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": { "id": "rec1", "name": "home.example.com", "content": "5.6.7.8", "type": "A" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cf = provider(&server, CloudflareAuth::Token("cf-token".to_string()));
        let record = Record {
            id: "rec1".to_string(),
            name: "home.example.com".to_string(),
            value: "1.2.3.4".to_string(),
            record_type: "A".to_string(),
            zone: "example.com".to_string(),
            zone_id: Some("zone123".to_string()),
        };

        tokio_test::assert_ok!(cf.update_record(&record, "5.6.7.8").await);
    }
}

mod alidns_tests {
    use crate::providers::alidns::{encode, sign};
    use crate::providers::{AliDnsProvider, DnsProvider};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    const SECRET: &str = "key-secret";

    /// Accepts requests whose `Signature` covers the rest of the query.
    struct SignedWith(&'static str);

    impl Match for SignedWith {
        fn matches(&self, request: &Request) -> bool {
            let Some(query) = request.url.query() else {
                return false;
            };
            let Some((canonical, signature)) = query.split_once("&Signature=") else {
                return false;
            };
            sign(self.0, canonical).is_ok_and(|expected| encode(&expected) == signature)
        }
    }

    fn provider(server: &MockServer) -> AliDnsProvider {
        AliDnsProvider::with_base_url(
            reqwest::Client::new(),
            "key-id".to_string(),
            SECRET.to_string(),
            "A",
            server.uri(),
        )
    }

    fn sub_domain_records() -> serde_json::Value {
        json!({
            "RequestId": "req-1",
            "TotalCount": 1,
            "DomainRecords": {
                "Record": [{
                    "RecordId": "9001",
                    "RR": "home",
                    "Value": "1.2.3.4",
                    "Type": "A",
                    "DomainName": "example.com",
                    "TTL": 600,
                    "Line": "default"
                }]
            }
        })
    }

    #[tokio::test]
    async fn test_alidns_find_record() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("Action", "DescribeSubDomainRecords"))
            .and(query_param("SubDomain", "home.example.com"))
            .and(query_param("Type", "A"))
            .and(query_param("AccessKeyId", "key-id"))
            .and(query_param("SignatureMethod", "HMAC-SHA1"))
            .and(query_param("Version", "2015-01-09"))
            .and(SignedWith(SECRET))
            .respond_with(ResponseTemplate::new(200).set_body_json(sub_domain_records()))
            .expect(1)
            .mount(&server)
            .await;

        let record = provider(&server)
            .find_record("example.com", "home.example.com")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.id, "9001");
        assert_eq!(record.name, "home.example.com");
        assert_eq!(record.value, "1.2.3.4");
        assert_eq!(record.label(), "home");
    }

    #[tokio::test]
    async fn test_alidns_find_missing_record() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("Action", "DescribeSubDomainRecords"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "RequestId": "req-2",
                "TotalCount": 0,
                "DomainRecords": { "Record": [] }
            })))
            .mount(&server)
            .await;

        let found = provider(&server)
            .find_record("example.com", "vpn.example.com")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_alidns_update_record() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("Action", "DescribeSubDomainRecords"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sub_domain_records()))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("Action", "UpdateDomainRecord"))
            .and(query_param("RecordId", "9001"))
            .and(query_param("RR", "home"))
            .and(query_param("Type", "A"))
            .and(query_param("Value", "5.6.7.8"))
            .and(SignedWith(SECRET))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "RequestId": "req-3",
                "RecordId": "9001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let alidns = provider(&server);
        let record = alidns
            .find_record("example.com", "home.example.com")
            .await
            .unwrap()
            .unwrap();
        tokio_test::assert_ok!(alidns.update_record(&record, "5.6.7.8").await);
    }

    #[tokio::test]
    async fn test_alidns_list_records() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("Action", "DescribeDomainRecords"))
            .and(query_param("DomainName", "example.com"))
            .and(query_param("TypeKeyWord", "A"))
            .and(SignedWith(SECRET))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "DomainRecords": {
                    "Record": [
                        { "RecordId": "1", "RR": "@", "Value": "1.2.3.4", "Type": "A", "DomainName": "example.com" },
                        { "RecordId": "2", "RR": "www", "Value": "1.2.3.4", "Type": "A", "DomainName": "example.com" },
                        { "RecordId": "3", "RR": "mail", "Value": "mx.example.net", "Type": "CNAME", "DomainName": "example.com" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let records = provider(&server).list_records("example.com").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "example.com");
        assert_eq!(records[0].label(), "@");
        assert_eq!(records[1].name, "www.example.com");
    }

    #[tokio::test]
    async fn test_alidns_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "RequestId": "req-4",
                "Code": "InvalidAccessKeyId.NotFound",
                "Message": "Specified access key is not found."
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .find_record("example.com", "home.example.com")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("InvalidAccessKeyId.NotFound"));
        assert!(err.to_string().contains("DescribeSubDomainRecords"));
    }
}

mod dnspod_tests {
    use crate::providers::{DnsPodProvider, DnsProvider};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_domains(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/Domain.List"))
            .and(body_string_contains("login_token=1234%2Csecret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": { "code": "1", "message": "Action completed successful" },
                "domains": [
                    { "id": 42, "name": "example.com" },
                    { "id": 43, "name": "example.org" }
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_dnspod_list_records() {
        let server = MockServer::start().await;
        mount_domains(&server).await;

        Mock::given(method("POST"))
            .and(path("/Record.List"))
            .and(body_string_contains("domain_id=42"))
            .and(body_string_contains("record_type=A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": { "code": "1", "message": "ok" },
                "records": [
                    { "id": "1001", "name": "home", "value": "1.2.3.4", "type": "A", "line": "默认" },
                    { "id": "1002", "name": "@", "value": "1.2.3.4", "type": "A", "line": "默认" }
                ]
            })))
            .mount(&server)
            .await;

        let dnspod = DnsPodProvider::with_base_url(
            reqwest::Client::new(),
            "1234,secret".to_string(),
            "A",
            server.uri(),
        );
        let records = dnspod.list_records("example.com").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "home.example.com");
        assert_eq!(records[0].zone_id.as_deref(), Some("42"));
        assert_eq!(records[1].name, "example.com");
        assert_eq!(records[1].label(), "@");
    }

    #[tokio::test]
    async fn test_dnspod_bad_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/Domain.List"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": { "code": "-1", "message": "Login failed" }
            })))
            .mount(&server)
            .await;

        let dnspod = DnsPodProvider::with_base_url(
            reqwest::Client::new(),
            "1234,wrong".to_string(),
            "A",
            server.uri(),
        );
        let err = dnspod.list_records("example.com").await.unwrap_err();
        assert!(err.to_string().contains("Login failed"));
    }

    #[tokio::test]
    async fn test_dnspod_update_record() {
        let server = MockServer::start().await;
        mount_domains(&server).await;

        Mock::given(method("POST"))
            .and(path("/Record.List"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": { "code": "1", "message": "ok" },
                "records": [
                    { "id": "1001", "name": "home", "value": "1.2.3.4", "type": "A" }
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/Record.Modify"))
            .and(body_string_contains("record_id=1001"))
            .and(body_string_contains("sub_domain=home"))
            .and(body_string_contains("value=5.6.7.8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": { "code": "1", "message": "ok" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dnspod = DnsPodProvider::with_base_url(
            reqwest::Client::new(),
            "1234,secret".to_string(),
            "A",
            server.uri(),
        );
        let records = dnspod.list_records("example.com").await.unwrap();
        tokio_test::assert_ok!(dnspod.update_record(&records[0], "5.6.7.8").await);
    }
}

mod he_tests {
    use crate::providers::{DnsProvider, HeProvider, Record};
    use crate::DdnsError;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> Record {
        Record::by_hostname("example.com", "home.example.com", "1.2.3.4", "A")
    }

    #[tokio::test]
    async fn test_he_update_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/nic/update"))
            .and(body_string_contains("hostname=home.example.com"))
            .and(body_string_contains("password=dyn-key"))
            .and(body_string_contains("myip=5.6.7.8"))
            .respond_with(ResponseTemplate::new(200).set_body_string("good 5.6.7.8"))
            .expect(1)
            .mount(&server)
            .await;

        let he = HeProvider::with_base_url(
            reqwest::Client::new(),
            "dyn-key".to_string(),
            "A",
            server.uri(),
        );
        tokio_test::assert_ok!(he.update_record(&record(), "5.6.7.8").await);
    }

    #[tokio::test]
    async fn test_he_bad_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/nic/update"))
            .respond_with(ResponseTemplate::new(200).set_body_string("badauth"))
            .mount(&server)
            .await;

        let he = HeProvider::with_base_url(
            reqwest::Client::new(),
            "wrong".to_string(),
            "A",
            server.uri(),
        );
        let err = he.update_record(&record(), "5.6.7.8").await.unwrap_err();
        assert!(matches!(err, DdnsError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_he_cannot_list() {
        let he = HeProvider::new(reqwest::Client::new(), "key".to_string(), "A");
        assert!(matches!(
            he.list_records("example.com").await,
            Err(DdnsError::Unsupported { .. })
        ));
    }
}

mod duckdns_tests {
    use crate::config::IpType;
    use crate::providers::{DnsProvider, DuckDnsProvider, Record};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> Record {
        Record::by_hostname("duckdns.org", "mysubdomain.duckdns.org", "1.2.3.4", "A")
    }

    #[tokio::test]
    async fn test_duckdns_update_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/update"))
            .and(query_param("domains", "mysubdomain"))
            .and(query_param("token", "mytoken"))
            .and(query_param("ip", "5.6.7.8"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = DuckDnsProvider::with_base_url(
            reqwest::Client::new(),
            "mytoken".to_string(),
            IpType::V4,
            server.uri(),
        );
        tokio_test::assert_ok!(provider.update_record(&record(), "5.6.7.8").await);
    }

    #[tokio::test]
    async fn test_duckdns_ipv6_parameter() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/update"))
            .and(query_param("ipv6", "2001:db8::1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = DuckDnsProvider::with_base_url(
            reqwest::Client::new(),
            "mytoken".to_string(),
            IpType::V6,
            server.uri(),
        );
        tokio_test::assert_ok!(provider.update_record(&record(), "2001:db8::1").await);
    }

    #[tokio::test]
    async fn test_duckdns_update_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/update"))
            .respond_with(ResponseTemplate::new(200).set_body_string("KO"))
            .mount(&server)
            .await;

        let provider = DuckDnsProvider::with_base_url(
            reqwest::Client::new(),
            "badtoken".to_string(),
            IpType::V4,
            server.uri(),
        );
        tokio_test::assert_err!(provider.update_record(&record(), "5.6.7.8").await);
    }
}

mod noip_tests {
    use crate::providers::{DnsProvider, NoIpProvider, Record};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_noip_update_with_basic_auth() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/nic/update"))
            .and(query_param("hostname", "home.example.com"))
            .and(query_param("myip", "5.6.7.8"))
            // base64("user:pass")
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_string("nochg 5.6.7.8"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = NoIpProvider::with_base_url(
            reqwest::Client::new(),
            "user".to_string(),
            "pass".to_string(),
            "A",
            server.uri(),
        );
        let record = Record::by_hostname("example.com", "home.example.com", "1.2.3.4", "A");
        tokio_test::assert_ok!(provider.update_record(&record, "5.6.7.8").await);
    }

    #[tokio::test]
    async fn test_noip_abuse_reply() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/nic/update"))
            .respond_with(ResponseTemplate::new(200).set_body_string("abuse"))
            .mount(&server)
            .await;

        let provider = NoIpProvider::with_base_url(
            reqwest::Client::new(),
            "user".to_string(),
            "pass".to_string(),
            "A",
            server.uri(),
        );
        let record = Record::by_hostname("example.com", "home.example.com", "1.2.3.4", "A");
        let err = provider.update_record(&record, "5.6.7.8").await.unwrap_err();
        assert!(err.to_string().contains("abuse"));
    }
}
