//! ClientHello fixtures for unit tests

/// Builds ClientHello handshake messages and the records that carry them
#[derive(Debug, Clone)]
pub struct ClientHelloBuilder {
    session_id: Vec<u8>,
    cipher_suites: Vec<u8>,
    compression_methods: Vec<u8>,
    extensions: Option<Vec<u8>>,
    extensions_length_delta: i32,
}

impl ClientHelloBuilder {
    pub fn new() -> Self {
        Self {
            session_id: Vec::new(),
            cipher_suites: vec![0x00, 0x2f, 0x00, 0x35],
            compression_methods: vec![0x00],
            extensions: Some(Vec::new()),
            extensions_length_delta: 0,
        }
    }

    pub fn session_id(mut self, id: &[u8]) -> Self {
        self.session_id = id.to_vec();
        self
    }

    pub fn raw_cipher_suites(mut self, suites: &[u8]) -> Self {
        self.cipher_suites = suites.to_vec();
        self
    }

    pub fn without_extensions(mut self) -> Self {
        self.extensions = None;
        self
    }

    pub fn extension(mut self, extension_type: u16, body: &[u8]) -> Self {
        let extensions = self.extensions.get_or_insert_with(Vec::new);
        extensions.extend_from_slice(&extension_type.to_be_bytes());
        extensions.extend_from_slice(&(body.len() as u16).to_be_bytes());
        extensions.extend_from_slice(body);
        self
    }

    pub fn server_name(self, host: &str) -> Self {
        self.raw_server_name_entries(&[(0, host.as_bytes())])
    }

    pub fn raw_server_name_entries(self, entries: &[(u8, &[u8])]) -> Self {
        let mut list = Vec::new();
        for (name_type, name) in entries {
            list.push(*name_type);
            list.extend_from_slice(&(name.len() as u16).to_be_bytes());
            list.extend_from_slice(name);
        }
        let mut body = (list.len() as u16).to_be_bytes().to_vec();
        body.extend_from_slice(&list);
        self.extension(0, &body)
    }

    /// Skews the declared extensions length away from the real one
    pub fn extensions_length_delta(&mut self, delta: i32) {
        self.extensions_length_delta = delta;
    }

    /// Handshake message: type, 24-bit length, ClientHello body
    pub fn handshake(&self) -> Vec<u8> {
        let mut body = vec![0x03, 0x03];
        body.extend((0..32u8).collect::<Vec<_>>());
        body.push(self.session_id.len() as u8);
        body.extend_from_slice(&self.session_id);
        body.extend_from_slice(&(self.cipher_suites.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.cipher_suites);
        body.push(self.compression_methods.len() as u8);
        body.extend_from_slice(&self.compression_methods);
        if let Some(extensions) = &self.extensions {
            let declared = (extensions.len() as i32 + self.extensions_length_delta) as u16;
            body.extend_from_slice(&declared.to_be_bytes());
            body.extend_from_slice(extensions);
        }

        let len = body.len() as u32;
        let mut message = vec![0x01];
        message.extend_from_slice(&len.to_be_bytes()[1..]);
        message.extend_from_slice(&body);
        message
    }

    /// The handshake message in a single TLS record
    pub fn record(&self) -> Vec<u8> {
        wrap_records(&self.handshake(), usize::MAX)
    }

    /// The handshake message spread over records of at most `fragment` bytes
    pub fn fragmented(&self, fragment: usize) -> Vec<u8> {
        wrap_records(&self.handshake(), fragment)
    }
}

/// Frames `payload` as consecutive handshake records
pub fn wrap_records(payload: &[u8], fragment: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in payload.chunks(fragment.max(1)) {
        out.extend_from_slice(&[0x16, 0x03, 0x01]);
        out.extend_from_slice(&(chunk.len() as u16).to_be_bytes());
        out.extend_from_slice(chunk);
    }
    out
}
