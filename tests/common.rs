// Builders for the synthetic fonts used by the tests. Everything here works on plain bytes so
// that it can be shared between the unit tests (through `include!`) and the integration tests.

/// Assert that two floats are equal to within a small tolerance.
#[track_caller]
pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "{} != {}",
        actual,
        expected
    );
}

/// A token of a charstring program.
#[derive(Debug, Copy, Clone)]
pub enum Cs {
    Int(i32),
    /// A 16.16 value, encoded with operator 255.
    Fixed(f64),
    Op(u8),
    /// A two byte operator, `12 x`.
    Esc(u8),
    Raw(u8),
}

/// Encode a charstring program.
pub fn charstring(program: &[Cs]) -> Vec<u8> {
    let mut data = Vec::new();
    for token in program {
        match *token {
            Cs::Int(n) => push_charstring_int(&mut data, n),
            Cs::Fixed(value) => {
                data.push(255);
                data.extend_from_slice(&((value * 65536.0).round() as i32).to_be_bytes());
            }
            Cs::Op(op) => data.push(op),
            Cs::Esc(op) => data.extend_from_slice(&[12, op]),
            Cs::Raw(byte) => data.push(byte),
        }
    }
    data
}

fn push_charstring_int(data: &mut Vec<u8>, n: i32) {
    match n {
        -107..=107 => data.push((n + 139) as u8),
        108..=1131 => {
            let n = n - 108;
            data.push(((n >> 8) + 247) as u8);
            data.push((n & 0xFF) as u8);
        }
        -1131..=-108 => {
            let n = -n - 108;
            data.push(((n >> 8) + 251) as u8);
            data.push((n & 0xFF) as u8);
        }
        -32768..=32767 => {
            data.push(28);
            data.extend_from_slice(&(n as i16).to_be_bytes());
        }
        _ => {
            data.push(255);
            data.extend_from_slice(&(n << 16).to_be_bytes());
        }
    }
}

/// Encode a DICT integer operand in its shortest form.
pub fn dict_int(n: i32) -> Vec<u8> {
    match n {
        -107..=107 => vec![(n + 139) as u8],
        108..=1131 => {
            let n = n - 108;
            vec![((n >> 8) + 247) as u8, (n & 0xFF) as u8]
        }
        -1131..=-108 => {
            let n = -n - 108;
            vec![((n >> 8) + 251) as u8, (n & 0xFF) as u8]
        }
        -32768..=32767 => {
            let [b0, b1] = (n as i16).to_be_bytes();
            vec![28, b0, b1]
        }
        _ => dict_offset(n as u32),
    }
}

/// Encode a DICT integer operand in the five byte form, so that its size does not depend on its
/// value.
pub fn dict_offset(n: u32) -> Vec<u8> {
    let mut data = vec![29];
    data.extend_from_slice(&n.to_be_bytes());
    data
}

/// Encode a CFF INDEX with a 16-bit count.
pub fn cff_index(items: &[Vec<u8>]) -> Vec<u8> {
    let mut data = (items.len() as u16).to_be_bytes().to_vec();
    index_body(&mut data, items);
    data
}

/// Encode a CFF2 INDEX with a 32-bit count.
pub fn cff2_index(items: &[Vec<u8>]) -> Vec<u8> {
    let mut data = (items.len() as u32).to_be_bytes().to_vec();
    index_body(&mut data, items);
    data
}

fn index_body(data: &mut Vec<u8>, items: &[Vec<u8>]) {
    if items.is_empty() {
        return;
    }
    let last_offset = 1 + items.iter().map(Vec::len).sum::<usize>();
    let off_size: usize = match last_offset {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x10000..=0xFF_FFFF => 3,
        _ => 4,
    };
    data.push(off_size as u8);
    let mut offset = 1;
    for item in items.iter().map(Vec::len).chain(std::iter::once(0)) {
        let bytes = (offset as u32).to_be_bytes();
        data.extend_from_slice(&bytes[4 - off_size..]);
        offset += item;
    }
    for item in items {
        data.extend_from_slice(item);
    }
}

/// Builds a single font CFF table, or a CFF2 table.
///
/// Name-keyed fonts use the standard encoding and, unless a charset is supplied, the ISOAdobe
/// charset. CFF2 fonts get a variation store with a single region that peaks at 1.0 on the first
/// axis.
#[derive(Debug, Clone)]
pub struct CffBuilder {
    glyphs: Vec<Vec<u8>>,
    global_subrs: Vec<Vec<u8>>,
    local_subrs: Vec<Vec<u8>>,
    charset: Option<Vec<u16>>,
    strings: Vec<&'static str>,
    font_dict_widths: Vec<(i32, i32)>,
    fd_select: Option<Vec<u8>>,
    cid: bool,
    char_strings: bool,
    cff2: bool,
}

impl CffBuilder {
    pub fn new(glyphs: Vec<Vec<u8>>) -> Self {
        CffBuilder {
            glyphs,
            global_subrs: Vec::new(),
            local_subrs: Vec::new(),
            charset: None,
            strings: Vec::new(),
            font_dict_widths: vec![(500, 600)],
            fd_select: None,
            cid: false,
            char_strings: true,
            cff2: false,
        }
    }

    pub fn global_subrs(mut self, subrs: Vec<Vec<u8>>) -> Self {
        self.global_subrs = subrs;
        self
    }

    /// Local subroutines, shared by every Font DICT.
    pub fn local_subrs(mut self, subrs: Vec<Vec<u8>>) -> Self {
        self.local_subrs = subrs;
        self
    }

    /// A format 0 charset: the SIDs (or CIDs) of glyphs 1 onwards.
    pub fn charset(mut self, ids: Vec<u16>) -> Self {
        self.charset = Some(ids);
        self
    }

    pub fn strings(mut self, strings: Vec<&'static str>) -> Self {
        self.strings = strings;
        self
    }

    /// `(defaultWidthX, nominalWidthX)` for each Font DICT.
    pub fn font_dict_widths(mut self, widths: Vec<(i32, i32)>) -> Self {
        self.font_dict_widths = widths;
        self
    }

    /// Make a CID-keyed font with a format 0 FDSelect of `fd_select`.
    pub fn cid(mut self, fd_select: Vec<u8>) -> Self {
        self.cid = true;
        let font_dicts = fd_select.iter().copied().max().map_or(1, |max| usize::from(max) + 1);
        while self.font_dict_widths.len() < font_dicts {
            self.font_dict_widths.push(self.font_dict_widths[0]);
        }
        self.fd_select = Some(fd_select);
        self
    }

    pub fn without_fd_select(mut self) -> Self {
        self.fd_select = None;
        self
    }

    pub fn without_char_strings(mut self) -> Self {
        self.char_strings = false;
        self
    }

    pub fn cff2(mut self) -> Self {
        self.cff2 = true;
        self.font_dict_widths.truncate(1);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        if self.cff2 {
            self.build_cff2()
        } else {
            self.build_cff()
        }
    }

    fn private_dict(&self, widths: Option<(i32, i32)>) -> Vec<u8> {
        let mut dict = Vec::new();
        if let Some((default_width_x, nominal_width_x)) = widths {
            dict.extend(dict_int(default_width_x));
            dict.push(20);
            dict.extend(dict_int(nominal_width_x));
            dict.push(21);
        }
        if !self.local_subrs.is_empty() {
            // The offset is relative to the start of the Private DICT, the subrs follow it.
            let len = dict.len() + 6;
            dict.extend(dict_offset(len as u32));
            dict.push(19);
        }
        dict
    }

    fn local_subrs_index(&self, cff2: bool) -> Vec<u8> {
        match (self.local_subrs.is_empty(), cff2) {
            (true, _) => Vec::new(),
            (false, false) => cff_index(&self.local_subrs),
            (false, true) => cff2_index(&self.local_subrs),
        }
    }

    fn build_cff(&self) -> Vec<u8> {
        let header = vec![1, 0, 4, 4];
        let name_index = cff_index(&[b"Test".to_vec()]);
        let string_index = cff_index(
            &self
                .strings
                .iter()
                .map(|s| s.as_bytes().to_vec())
                .collect::<Vec<_>>(),
        );
        let global_subrs = cff_index(&self.global_subrs);
        let char_strings = cff_index(&self.glyphs);
        let charset = self.charset.as_ref().map(|ids| {
            let mut data = vec![0];
            for id in ids {
                data.extend_from_slice(&id.to_be_bytes());
            }
            data
        });
        let widths = if self.cid {
            self.font_dict_widths.clone()
        } else {
            self.font_dict_widths[..1].to_vec()
        };
        let privates = widths
            .iter()
            .map(|widths| {
                let mut data = self.private_dict(Some(*widths));
                let len = data.len();
                data.extend(self.local_subrs_index(false));
                (data, len)
            })
            .collect::<Vec<_>>();

        let top_dict_len = self.cff_top_dict(&Layout::default()).len();
        let top_dict_index_len = cff_index(&[vec![0; top_dict_len]]).len();

        let mut layout = Layout::default();
        let mut offset = header.len()
            + name_index.len()
            + top_dict_index_len
            + string_index.len()
            + global_subrs.len();
        layout.char_strings = offset;
        offset += char_strings.len();
        if let Some(charset) = &charset {
            layout.charset = offset;
            offset += charset.len();
        }
        for (data, len) in &privates {
            layout.privates.push((*len, offset));
            offset += data.len();
        }
        let fd_array = cff_index(
            &layout
                .privates
                .iter()
                .map(|(len, offset)| private_operator(*len, *offset))
                .collect::<Vec<_>>(),
        );
        layout.fd_array = offset;
        offset += fd_array.len();
        layout.fd_select = offset;

        let mut data = header;
        data.extend(name_index);
        data.extend(cff_index(&[self.cff_top_dict(&layout)]));
        data.extend(string_index);
        data.extend(global_subrs);
        data.extend(char_strings);
        data.extend(charset.unwrap_or_default());
        for (private, _) in privates {
            data.extend(private);
        }
        if self.cid {
            data.extend(fd_array);
            if let Some(fd_select) = &self.fd_select {
                data.push(0);
                data.extend(fd_select);
            }
        }
        data
    }

    fn cff_top_dict(&self, layout: &Layout) -> Vec<u8> {
        let mut dict = Vec::new();
        if self.cid {
            // ROS: Adobe-Identity-0, using SIDs of the first custom strings
            dict.extend(dict_int(391));
            dict.extend(dict_int(392));
            dict.extend(dict_int(0));
            dict.extend([12, 30]);
        }
        if self.charset.is_some() {
            dict.extend(dict_offset(layout.charset as u32));
            dict.push(15);
        }
        if self.char_strings {
            dict.extend(dict_offset(layout.char_strings as u32));
            dict.push(17);
        }
        if self.cid {
            dict.extend(dict_offset(layout.fd_array as u32));
            dict.extend([12, 36]);
            if self.fd_select.is_some() {
                dict.extend(dict_offset(layout.fd_select as u32));
                dict.extend([12, 37]);
            }
        } else {
            let (len, offset) = layout.privates.first().copied().unwrap_or_default();
            dict.extend(private_operator(len, offset));
        }
        dict
    }

    fn build_cff2(&self) -> Vec<u8> {
        let global_subrs = cff2_index(&self.global_subrs);
        let char_strings = cff2_index(&self.glyphs);
        let vstore = variation_store();
        let mut private = self.private_dict(None);
        let private_len = private.len();
        private.extend(self.local_subrs_index(true));

        let top_dict_len = self.cff2_top_dict(&Layout::default()).len();
        let mut layout = Layout::default();
        let mut offset = 5 + top_dict_len + global_subrs.len();
        layout.char_strings = offset;
        offset += char_strings.len();
        layout.vstore = offset;
        offset += vstore.len();
        let fd_array_len = cff2_index(&[private_operator(0, 0)]).len();
        layout.fd_array = offset;
        offset += fd_array_len;
        let fd_array = cff2_index(&[private_operator(private_len, offset)]);

        let top_dict = self.cff2_top_dict(&layout);
        let mut data = vec![2, 0, 5];
        data.extend_from_slice(&(top_dict.len() as u16).to_be_bytes());
        data.extend(top_dict);
        data.extend(global_subrs);
        data.extend(char_strings);
        data.extend(vstore);
        data.extend(fd_array);
        data.extend(private);
        data
    }

    fn cff2_top_dict(&self, layout: &Layout) -> Vec<u8> {
        let mut dict = Vec::new();
        if self.char_strings {
            dict.extend(dict_offset(layout.char_strings as u32));
            dict.push(17);
        }
        dict.extend(dict_offset(layout.fd_array as u32));
        dict.extend([12, 36]);
        dict.extend(dict_offset(layout.vstore as u32));
        dict.push(24);
        dict
    }
}

#[derive(Debug, Default)]
struct Layout {
    char_strings: usize,
    charset: usize,
    privates: Vec<(usize, usize)>,
    fd_array: usize,
    fd_select: usize,
    vstore: usize,
}

fn private_operator(len: usize, offset: usize) -> Vec<u8> {
    let mut data = dict_offset(len as u32);
    data.extend(dict_offset(offset as u32));
    data.push(18);
    data
}

// A length prefixed ItemVariationStore with one axis and one region, (0, 1, 1).
fn variation_store() -> Vec<u8> {
    let mut store = Vec::new();
    store.extend_from_slice(&1u16.to_be_bytes()); // format
    store.extend_from_slice(&12u32.to_be_bytes()); // region list
    store.extend_from_slice(&1u16.to_be_bytes()); // data count
    store.extend_from_slice(&22u32.to_be_bytes()); // data offset
    // VariationRegionList
    store.extend_from_slice(&1u16.to_be_bytes());
    store.extend_from_slice(&1u16.to_be_bytes());
    store.extend_from_slice(&[0x00, 0x00, 0x40, 0x00, 0x40, 0x00]);
    // ItemVariationData: no items, one region
    store.extend_from_slice(&0u16.to_be_bytes());
    store.extend_from_slice(&0u16.to_be_bytes());
    store.extend_from_slice(&1u16.to_be_bytes());
    store.extend_from_slice(&0u16.to_be_bytes());

    let mut data = (store.len() as u16).to_be_bytes().to_vec();
    data.extend(store);
    data
}

fn f2dot14(value: f32) -> [u8; 2] {
    ((value * 16384.0).round() as i16).to_be_bytes()
}

/// One tuple variation of a glyph.
#[derive(Debug, Clone)]
pub struct GvarTuple {
    shared_index: Option<u16>,
    peak: Vec<f32>,
    intermediate: Option<(Vec<f32>, Vec<f32>)>,
    points: Option<Vec<u16>>,
    deltas: Vec<(i16, i16)>,
}

impl GvarTuple {
    /// A tuple using shared peak `index`, with a delta for every point (phantom points included).
    pub fn shared(
        index: u16,
        intermediate: Option<(&[f32], &[f32])>,
        deltas: &[(i16, i16)],
    ) -> Self {
        GvarTuple {
            shared_index: Some(index),
            peak: Vec::new(),
            intermediate: intermediate.map(|(start, end)| (start.to_vec(), end.to_vec())),
            points: None,
            deltas: deltas.to_vec(),
        }
    }

    /// A tuple with an embedded peak. With `points` the deltas apply to those points only.
    pub fn embedded(peak: &[f32], points: Option<&[u16]>, deltas: &[(i16, i16)]) -> Self {
        GvarTuple {
            shared_index: None,
            peak: peak.to_vec(),
            intermediate: None,
            points: points.map(<[u16]>::to_vec),
            deltas: deltas.to_vec(),
        }
    }

    fn header(&self, data_size: usize) -> Vec<u8> {
        let mut flags = self.shared_index.unwrap_or(0);
        if self.shared_index.is_none() {
            flags |= 0x8000;
        }
        if self.intermediate.is_some() {
            flags |= 0x4000;
        }
        // Private point numbers, a count of zero when every point has a delta
        flags |= 0x2000;
        let mut header = (data_size as u16).to_be_bytes().to_vec();
        header.extend_from_slice(&flags.to_be_bytes());
        for value in &self.peak {
            header.extend_from_slice(&f2dot14(*value));
        }
        if let Some((start, end)) = &self.intermediate {
            for value in start.iter().chain(end) {
                header.extend_from_slice(&f2dot14(*value));
            }
        }
        header
    }

    fn data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        match &self.points {
            Some(points) => packed_points(&mut data, points),
            None => data.push(0),
        }
        let x = self.deltas.iter().map(|(x, _)| *x);
        let y = self.deltas.iter().map(|(_, y)| *y);
        packed_deltas(&mut data, &x.chain(y).collect::<Vec<_>>());
        data
    }
}

fn packed_points(data: &mut Vec<u8>, points: &[u16]) {
    let count = points.len();
    if count < 128 {
        data.push(count as u8);
    } else {
        data.extend_from_slice(&(count as u16 | 0x8000).to_be_bytes());
    }
    let mut prev = 0;
    for run in points.chunks(128) {
        data.push(0x80 | (run.len() - 1) as u8);
        for point in run {
            data.extend_from_slice(&(point - prev).to_be_bytes());
            prev = *point;
        }
    }
}

fn packed_deltas(data: &mut Vec<u8>, deltas: &[i16]) {
    for run in deltas.chunks(64) {
        if run.iter().all(|delta| *delta == 0) {
            data.push(0x80 | (run.len() - 1) as u8);
        } else if run.iter().all(|delta| i8::try_from(*delta).is_ok()) {
            data.push((run.len() - 1) as u8);
            data.extend(run.iter().map(|delta| *delta as i8 as u8));
        } else {
            data.push(0x40 | (run.len() - 1) as u8);
            for delta in run {
                data.extend_from_slice(&delta.to_be_bytes());
            }
        }
    }
}

/// Builds a `gvar` table with long offsets.
#[derive(Debug, Clone)]
pub struct GvarBuilder {
    axis_count: u16,
    shared_tuples: Vec<Vec<f32>>,
    glyphs: Vec<Vec<GvarTuple>>,
}

impl GvarBuilder {
    pub fn new(axis_count: u16) -> Self {
        GvarBuilder {
            axis_count,
            shared_tuples: Vec::new(),
            glyphs: Vec::new(),
        }
    }

    pub fn shared_tuple(&mut self, peak: &[f32]) -> &mut Self {
        self.shared_tuples.push(peak.to_vec());
        self
    }

    pub fn glyph(&mut self, tuples: &[GvarTuple]) -> &mut Self {
        self.glyphs.push(tuples.to_vec());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let glyph_data = self
            .glyphs
            .iter()
            .map(|tuples| {
                if tuples.is_empty() {
                    return Vec::new();
                }
                let serialized = tuples.iter().map(GvarTuple::data).collect::<Vec<_>>();
                let headers = tuples
                    .iter()
                    .zip(&serialized)
                    .flat_map(|(tuple, data)| tuple.header(data.len()))
                    .collect::<Vec<_>>();
                let mut data = (tuples.len() as u16).to_be_bytes().to_vec();
                data.extend_from_slice(&((4 + headers.len()) as u16).to_be_bytes());
                data.extend(headers);
                data.extend(serialized.concat());
                data
            })
            .collect::<Vec<_>>();

        let header_len = 20 + 4 * (self.glyphs.len() + 1);
        let shared_tuples = self
            .shared_tuples
            .iter()
            .flatten()
            .flat_map(|value| f2dot14(*value))
            .collect::<Vec<_>>();

        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&self.axis_count.to_be_bytes());
        data.extend_from_slice(&(self.shared_tuples.len() as u16).to_be_bytes());
        data.extend_from_slice(&(header_len as u32).to_be_bytes());
        data.extend_from_slice(&(self.glyphs.len() as u16).to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes()); // long offsets
        data.extend_from_slice(&((header_len + shared_tuples.len()) as u32).to_be_bytes());
        let mut offset = 0u32;
        data.extend_from_slice(&offset.to_be_bytes());
        for glyph in &glyph_data {
            offset += glyph.len() as u32;
            data.extend_from_slice(&offset.to_be_bytes());
        }
        data.extend(shared_tuples);
        data.extend(glyph_data.concat());
        data
    }
}

/// A glyph for `GlyfBuilder`.
#[derive(Debug, Clone)]
pub enum TestGlyph {
    Empty,
    /// Contours of `(x, y, on_curve)` points.
    Simple(Vec<Vec<(i16, i16, bool)>>),
    Composite(Vec<TestComponent>),
    Raw(Vec<u8>),
}

/// A component of a composite `TestGlyph`.
#[derive(Debug, Clone, Copy)]
pub struct TestComponent {
    pub glyph_id: u16,
    /// An offset, or with `point_matching` the parent and child point numbers.
    pub args: (i16, i16),
    pub point_matching: bool,
    pub scale: Option<f32>,
    pub scaled_offset: bool,
}

impl TestComponent {
    pub fn offset(glyph_id: u16, dx: i16, dy: i16) -> Self {
        TestComponent {
            glyph_id,
            args: (dx, dy),
            point_matching: false,
            scale: None,
            scaled_offset: false,
        }
    }
}

/// Builds `glyf` and long format `loca` tables.
#[derive(Debug, Clone, Default)]
pub struct GlyfBuilder {
    glyphs: Vec<TestGlyph>,
}

impl GlyfBuilder {
    pub fn new(glyphs: Vec<TestGlyph>) -> Self {
        GlyfBuilder { glyphs }
    }

    /// Returns `(glyf, loca)`.
    pub fn build(&self) -> (Vec<u8>, Vec<u8>) {
        let mut glyf = Vec::new();
        let mut loca = 0u32.to_be_bytes().to_vec();
        for glyph in &self.glyphs {
            match glyph {
                TestGlyph::Empty => {}
                TestGlyph::Simple(contours) => simple_glyph(&mut glyf, contours),
                TestGlyph::Composite(components) => composite_glyph(&mut glyf, components),
                TestGlyph::Raw(data) => glyf.extend_from_slice(data),
            }
            loca.extend_from_slice(&(glyf.len() as u32).to_be_bytes());
        }
        (glyf, loca)
    }
}

fn simple_glyph(glyf: &mut Vec<u8>, contours: &[Vec<(i16, i16, bool)>]) {
    let points = contours.iter().flatten().copied().collect::<Vec<_>>();
    let x_min = points.iter().map(|p| p.0).min().unwrap_or(0);
    let y_min = points.iter().map(|p| p.1).min().unwrap_or(0);
    let x_max = points.iter().map(|p| p.0).max().unwrap_or(0);
    let y_max = points.iter().map(|p| p.1).max().unwrap_or(0);
    for value in [contours.len() as i16, x_min, y_min, x_max, y_max] {
        glyf.extend_from_slice(&value.to_be_bytes());
    }
    let mut end = 0u16;
    for contour in contours {
        end += contour.len() as u16;
        glyf.extend_from_slice(&(end - 1).to_be_bytes());
    }
    glyf.extend_from_slice(&0u16.to_be_bytes()); // instructions

    let mut flags = Vec::new();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let (mut prev_x, mut prev_y) = (0i16, 0i16);
    for (x, y, on_curve) in &points {
        let mut flag = u8::from(*on_curve);
        let (dx, dy) = (x - prev_x, y - prev_y);
        encode_coordinate(dx, &mut flag, 0x02, 0x10, &mut xs);
        encode_coordinate(dy, &mut flag, 0x04, 0x20, &mut ys);
        flags.push(flag);
        prev_x = *x;
        prev_y = *y;
    }
    // Run length encode the flags
    let mut i = 0;
    while i < flags.len() {
        let flag = flags[i];
        let run = flags[i + 1..]
            .iter()
            .take(255)
            .take_while(|f| **f == flag)
            .count();
        if run > 0 {
            glyf.push(flag | 0x08);
            glyf.push(run as u8);
        } else {
            glyf.push(flag);
        }
        i += run + 1;
    }
    glyf.extend(xs);
    glyf.extend(ys);
}

fn encode_coordinate(delta: i16, flag: &mut u8, short: u8, same_or_positive: u8, out: &mut Vec<u8>) {
    if delta == 0 {
        *flag |= same_or_positive;
    } else if delta.unsigned_abs() < 256 {
        *flag |= short;
        if delta > 0 {
            *flag |= same_or_positive;
        }
        out.push(delta.unsigned_abs() as u8);
    } else {
        out.extend_from_slice(&delta.to_be_bytes());
    }
}

fn composite_glyph(glyf: &mut Vec<u8>, components: &[TestComponent]) {
    for value in [-1i16, 0, 0, 0, 0] {
        glyf.extend_from_slice(&value.to_be_bytes());
    }
    for (i, component) in components.iter().enumerate() {
        // ARG_1_AND_2_ARE_WORDS
        let mut flags = 0x0001u16;
        if !component.point_matching {
            flags |= 0x0002;
        }
        if component.scale.is_some() {
            flags |= 0x0008;
        }
        if i + 1 < components.len() {
            flags |= 0x0020;
        }
        if component.scaled_offset {
            flags |= 0x0800;
        }
        glyf.extend_from_slice(&flags.to_be_bytes());
        glyf.extend_from_slice(&component.glyph_id.to_be_bytes());
        glyf.extend_from_slice(&component.args.0.to_be_bytes());
        glyf.extend_from_slice(&component.args.1.to_be_bytes());
        if let Some(scale) = component.scale {
            glyf.extend_from_slice(&f2dot14(scale));
        }
    }
}

/// Wrap `tables` in an sfnt table directory. Tables are 4-byte aligned.
pub fn sfnt(version: u32, tables: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut data = version.to_be_bytes().to_vec();
    data.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    data.extend_from_slice(&[0; 6]);
    let mut offset = 12 + 16 * tables.len();
    for (tag, table) in tables {
        data.extend_from_slice(tag);
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&(offset as u32).to_be_bytes());
        data.extend_from_slice(&(table.len() as u32).to_be_bytes());
        offset += (table.len() + 3) & !3;
    }
    for (_, table) in tables {
        data.extend_from_slice(table);
        data.resize((data.len() + 3) & !3, 0);
    }
    data
}

/// A `head` table with `units_per_em` and long `loca` offsets.
pub fn head_table(units_per_em: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // version
    data.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // fontRevision
    data.extend_from_slice(&0u32.to_be_bytes()); // checksumAdjustment
    data.extend_from_slice(&0x5F0F_3CF5u32.to_be_bytes()); // magicNumber
    data.extend_from_slice(&0u16.to_be_bytes()); // flags
    data.extend_from_slice(&units_per_em.to_be_bytes());
    data.extend_from_slice(&[0; 16]); // created, modified
    data.extend_from_slice(&[0; 8]); // bbox
    data.extend_from_slice(&0u16.to_be_bytes()); // macStyle
    data.extend_from_slice(&8u16.to_be_bytes()); // lowestRecPPEM
    data.extend_from_slice(&2i16.to_be_bytes()); // fontDirectionHint
    data.extend_from_slice(&1i16.to_be_bytes()); // indexToLocFormat
    data.extend_from_slice(&0i16.to_be_bytes()); // glyphDataFormat
    data
}

/// A version 0.5 `maxp` table.
pub fn maxp_table(num_glyphs: u16) -> Vec<u8> {
    let mut data = 0x0000_5000u32.to_be_bytes().to_vec();
    data.extend_from_slice(&num_glyphs.to_be_bytes());
    data
}

/// `hhea` and `hmtx` tables with one long metric per glyph.
pub fn hmtx_tables(metrics: &[(u16, i16)]) -> (Vec<u8>, Vec<u8>) {
    let mut hhea = 0x0001_0000u32.to_be_bytes().to_vec();
    hhea.extend_from_slice(&[0; 30]);
    hhea.extend_from_slice(&(metrics.len() as u16).to_be_bytes());
    let hmtx = metrics
        .iter()
        .flat_map(|(advance, lsb)| {
            let [a0, a1] = advance.to_be_bytes();
            let [l0, l1] = lsb.to_be_bytes();
            [a0, a1, l0, l1]
        })
        .collect();
    (hhea, hmtx)
}
