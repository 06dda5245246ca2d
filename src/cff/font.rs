//! Reading of glyphs from a CFF or CFF2 table.
//!
//! `CFFFontReader` parses only what it needs up front: the header, the Top DICT and the
//! CharStrings INDEX. The string INDEX, global subroutines, charset, encoding and FDSelect are
//! read on the first glyph request. The Private DICT of the Font DICT in use is cached so that
//! consecutive glyphs of the same Font DICT do not parse it again.

use std::convert::TryFrom;
use std::fmt;

use log::{debug, warn};
use ouroboros::self_referencing;
use rustc_hash::FxHashMap;

use super::blend::Blender;
use super::charstring::{
    BlueZones, FontContext, FontDictContext, GlyphMetrics, InterpreterConfig, Type2Interpreter,
};
use super::{
    cff2, read_charset, read_encoding, read_local_subr_index, CFFError, Charset, Dict,
    DictArgs, DictDefault, FDSelect, FontDict, FontMatrix, GlyphEncodings, Header, Index,
    IndexFormat, Operator, ParseOptions, PrivateDictDefault, StringPool, TopDict,
};
use crate::binary::read::ReadScope;
use crate::binary::source::{ByteSource, SourceCursor};
use crate::error::ParseError;
use crate::outline::{GlyphInfo, OutlineSink};
use crate::tables::variable_fonts::ItemVariationStore;
use crate::tables::{F2Dot14, TableLocator, TableRange};
use crate::{tag, GlyphId};

/// How far a `CFFFontReader` has got through the font.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReaderState {
    Unopened,
    HeaderRead,
    TopDictRead,
    /// The font is CID-keyed (or CFF2) and its FDArray has been located.
    CIDInit,
    /// The font is name-keyed.
    NonCIDInit,
    CharstringsIndexed,
    /// Strings, subroutines, charset and encoding or FDSelect have been read.
    GlyphsInitialized,
}

/// What `CFFFontReader::visit_all` does when a glyph fails.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GlyphErrorPolicy {
    /// Stop at the first error.
    Abort,
    /// Log the error and continue with the next glyph. Errors that affect the whole font still
    /// stop the batch.
    SkipGlyph,
}

/// Reads glyphs from the data of a CFF or CFF2 table.
pub struct CFFFontReader<'a> {
    scope: ReadScope<'a>,
    options: ParseOptions,
    state: ReaderState,
    font_name: Option<&'a [u8]>,
    // Offset of the String INDEX (CFF) or Global Subr INDEX (CFF2)
    after_top_dict: usize,
    char_strings: Index<'a>,
    kind: FontKind<'a>,
    coords: Vec<F2Dot14>,
    glyphs: Option<GlyphTables<'a>>,
    font_dict: Option<(u16, FontDictContext<'a>)>,
    interpreter: Type2Interpreter,
}

enum FontKind<'a> {
    NameKeyed {
        top_dict: TopDict,
    },
    CidKeyed {
        top_dict: TopDict,
        fd_array: Index<'a>,
        fd_select_offset: usize,
    },
    Cff2 {
        top_dict: cff2::TopDict,
        fd_array: Index<'a>,
        fd_select_offset: Option<usize>,
        vstore: Option<ItemVariationStore<'a>>,
    },
}

struct GlyphTables<'a> {
    global_subrs: Index<'a>,
    strings: Option<StringPool<'a>>,
    charset: Option<Charset<'a>>,
    encodings: Option<GlyphEncodings>,
    records: Vec<GlyphRecord>,
    names: Option<FxHashMap<&'a [u8], GlyphId>>,
}

#[derive(Debug, Copy, Clone)]
struct GlyphRecord {
    sid: Option<u16>,
    cid: Option<u16>,
    font_dict_index: u16,
}

/// A CFF or CFF2 table loaded into memory, together with its reader.
#[self_referencing]
pub struct OwnedCFFFont {
    data: Box<[u8]>,
    #[borrows(data)]
    #[not_covariant]
    reader: CFFFontReader<'this>,
}

impl<'a> CFFFontReader<'a> {
    /// Open the CFF or CFF2 table in `data`.
    pub fn new(data: &'a [u8], options: ParseOptions) -> Result<Self, CFFError> {
        Self::with_config(data, options, InterpreterConfig::default())
    }

    pub fn with_config(
        data: &'a [u8],
        options: ParseOptions,
        config: InterpreterConfig,
    ) -> Result<Self, CFFError> {
        let scope = ReadScope::new(data);
        let major = data.first().copied().ok_or(CFFError::BadFont)?;
        let (state, font_name, after_top_dict, kind) = match major {
            1 => Self::open_cff(scope, options)?,
            2 => Self::open_cff2(scope, options)?,
            _ => return Err(CFFError::BadFont),
        };
        let mut reader = CFFFontReader {
            scope,
            options,
            state,
            font_name,
            after_top_dict,
            char_strings: Index::empty(IndexFormat::Cff),
            kind,
            coords: Vec::new(),
            glyphs: None,
            font_dict: None,
            interpreter: Type2Interpreter::new(config),
        };
        reader.char_strings = reader.read_char_strings()?;
        reader.state = ReaderState::CharstringsIndexed;
        Ok(reader)
    }

    fn open_cff(
        scope: ReadScope<'a>,
        options: ParseOptions,
    ) -> Result<(ReaderState, Option<&'a [u8]>, usize, FontKind<'a>), CFFError> {
        let mut ctxt = scope.ctxt();
        ctxt.read::<Header>()?;
        let name_index = ctxt.read_dep::<Index<'_>>(IndexFormat::Cff)?;
        let top_dict_index = ctxt.read_dep::<Index<'_>>(IndexFormat::Cff)?;
        let after_top_dict = ctxt.tell();
        if top_dict_index.count > 1 {
            debug!("only the first of {} fonts is read", top_dict_index.count);
        }
        let font_name = name_index.read_object(0).ok();
        let top_dict = top_dict_index.read_item::<TopDict>(0, DictArgs::cff(options))?;

        let kind = if top_dict.is_cid_keyed() {
            let fd_array = read_fd_array(&scope, &top_dict, IndexFormat::Cff)?
                .ok_or(CFFError::NoFDArray)?;
            let fd_select_offset = fd_select_offset(&top_dict)?.ok_or(CFFError::NoFDSelect)?;
            FontKind::CidKeyed {
                top_dict,
                fd_array,
                fd_select_offset,
            }
        } else {
            FontKind::NameKeyed { top_dict }
        };
        Ok((ReaderState::TopDictRead, font_name, after_top_dict, kind))
    }

    fn open_cff2(
        scope: ReadScope<'a>,
        options: ParseOptions,
    ) -> Result<(ReaderState, Option<&'a [u8]>, usize, FontKind<'a>), CFFError> {
        let mut ctxt = scope.ctxt();
        let header = ctxt.read::<cff2::Header>()?;
        let top_dict = ctxt
            .read_scope(usize::from(header.top_dict_length))
            .map_err(ParseError::from)?
            .read_dep::<cff2::TopDict>(DictArgs::cff2(options, None))?;
        let after_top_dict = ctxt.tell();

        let fd_array =
            read_fd_array(&scope, &top_dict, IndexFormat::Cff2)?.ok_or(CFFError::NoFDArray)?;
        let fd_select_offset = fd_select_offset(&top_dict)?;
        if fd_select_offset.is_none() && fd_array.count > 1 {
            return Err(CFFError::NoFDSelect);
        }
        let vstore = cff2::read_variation_store(&scope, &top_dict)?;
        let kind = FontKind::Cff2 {
            top_dict,
            fd_array,
            fd_select_offset,
            vstore,
        };
        Ok((ReaderState::TopDictRead, None, after_top_dict, kind))
    }

    fn read_char_strings(&mut self) -> Result<Index<'a>, CFFError> {
        let (offset, format) = match &self.kind {
            FontKind::NameKeyed { top_dict } => {
                self.state = ReaderState::NonCIDInit;
                (top_dict.get_i32(Operator::CharStrings), IndexFormat::Cff)
            }
            FontKind::CidKeyed { top_dict, .. } => {
                self.state = ReaderState::CIDInit;
                (top_dict.get_i32(Operator::CharStrings), IndexFormat::Cff)
            }
            FontKind::Cff2 { top_dict, .. } => {
                self.state = ReaderState::CIDInit;
                (top_dict.get_i32(Operator::CharStrings), IndexFormat::Cff2)
            }
        };
        let offset = offset.ok_or(CFFError::NoCharStrings)??;
        let char_strings = self
            .scope
            .offset(usize::try_from(offset).map_err(ParseError::from)?)
            .read_dep::<Index<'_>>(format)?;
        Ok(char_strings)
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn is_cff2(&self) -> bool {
        matches!(self.kind, FontKind::Cff2 { .. })
    }

    pub fn is_cid_keyed(&self) -> bool {
        matches!(self.kind, FontKind::CidKeyed { .. })
    }

    /// The number of glyphs in the font.
    pub fn glyph_count(&self) -> usize {
        self.char_strings.len()
    }

    /// The name of the font, from the Name INDEX. CFF2 fonts have none.
    pub fn font_name(&self) -> Option<&'a str> {
        self.font_name
            .and_then(|name| std::str::from_utf8(name).ok())
    }

    /// The FontMatrix of the Top DICT.
    pub fn font_matrix(&self) -> Result<FontMatrix, CFFError> {
        let matrix = match &self.kind {
            FontKind::NameKeyed { top_dict } | FontKind::CidKeyed { top_dict, .. } => {
                top_dict.font_matrix()
            }
            FontKind::Cff2 { top_dict, .. } => top_dict.font_matrix(),
        };
        Ok(matrix.transpose()?.unwrap_or_default())
    }

    /// The matrix that maps the charstring of `glyph_id` to text space.
    ///
    /// For CID-keyed fonts this combines the Top DICT matrix with that of the glyph's Font DICT.
    pub fn glyph_font_matrix(&mut self, glyph_id: GlyphId) -> Result<FontMatrix, CFFError> {
        let top = self.font_matrix()?;
        let record = self.glyph_record(glyph_id)?;
        self.select_font_dict(record.font_dict_index)?;
        let font_dict = self.font_dict.as_ref().and_then(|(_, fd)| fd.font_matrix);
        Ok(combine_font_matrix(top, font_dict))
    }

    pub fn units_per_em(&self) -> Result<u16, CFFError> {
        self.font_matrix().map(|matrix| matrix.units_per_em())
    }

    /// Set the normalised location at which CFF2 blends are resolved.
    pub fn set_variation_coords(&mut self, coords: &[F2Dot14]) {
        self.coords = coords.to_vec();
        // Blended Private DICT values depend on the location
        self.font_dict = None;
    }

    pub fn variation_coords(&self) -> &[F2Dot14] {
        &self.coords
    }

    /// The name of `glyph_id` in a name-keyed font.
    pub fn glyph_name(&mut self, glyph_id: GlyphId) -> Result<Option<&'a str>, CFFError> {
        let record = self.glyph_record(glyph_id)?;
        let tables = self.glyph_tables()?;
        match (&tables.strings, record.sid) {
            (Some(strings), Some(sid)) => Ok(Some(strings.get(sid)?)),
            _ => Ok(None),
        }
    }

    /// The CID of `glyph_id` in a CID-keyed font.
    pub fn glyph_cid(&mut self, glyph_id: GlyphId) -> Result<Option<u16>, CFFError> {
        self.glyph_record(glyph_id).map(|record| record.cid)
    }

    /// Look up a glyph by name. The first glyph with the name wins.
    pub fn glyph_for_name(&mut self, name: &str) -> Result<Option<GlyphId>, CFFError> {
        let tables = self.glyph_tables()?;
        if tables.names.is_none() {
            tables.names = Some(glyph_names(tables));
        }
        Ok(tables
            .names
            .as_ref()
            .and_then(|names| names.get(name.as_bytes()).copied()))
    }

    /// The encoding codes of `glyph_id`, primary code first.
    pub fn glyph_codes(&mut self, glyph_id: GlyphId) -> Result<&[u8], CFFError> {
        let tables = self.glyph_tables()?;
        Ok(tables
            .encodings
            .as_ref()
            .map_or(&[], |encodings| encodings.codes(glyph_id)))
    }

    /// The glyph that `code` maps to through the font's encoding.
    pub fn glyph_for_code(&mut self, code: u8) -> Result<Option<GlyphId>, CFFError> {
        let tables = self.glyph_tables()?;
        Ok(tables
            .encodings
            .as_ref()
            .and_then(|encodings| encodings.glyph_for_code(code)))
    }

    /// Interpret the charstring of `glyph_id`, delivering its outline to `sink`.
    ///
    /// Returns `None` if the sink skipped the glyph.
    pub fn get_glyph<S: OutlineSink>(
        &mut self,
        glyph_id: GlyphId,
        sink: &mut S,
    ) -> Result<Option<GlyphMetrics>, CFFError> {
        let record = self.glyph_record(glyph_id)?;
        self.select_font_dict(record.font_dict_index)?;

        let CFFFontReader {
            ref char_strings,
            ref kind,
            ref coords,
            ref glyphs,
            ref font_dict,
            ref mut interpreter,
            ..
        } = *self;
        let (tables, font_dict) = match (glyphs, font_dict) {
            (Some(tables), Some((_, font_dict))) => (tables, font_dict),
            _ => return Err(CFFError::BadFont),
        };
        let (charset, blender, font_dict_index) = match kind {
            FontKind::NameKeyed { .. } => (tables.charset.as_ref(), None, None),
            FontKind::CidKeyed { .. } => (None, None, Some(record.font_dict_index)),
            FontKind::Cff2 { vstore, .. } => (
                None,
                vstore.as_ref().map(|store| Blender::new(store, coords)),
                Some(record.font_dict_index),
            ),
        };
        let font = FontContext {
            char_strings,
            global_subrs: &tables.global_subrs,
            charset,
            font_dict,
            blender,
            is_cff2: matches!(kind, FontKind::Cff2 { .. }),
        };
        let info = GlyphInfo {
            glyph_id,
            sid: record.sid,
            cid: record.cid,
            font_dict_index,
        };
        interpreter.interpret(&font, &info, sink)
    }

    /// Deliver every glyph of the font to `sink`, returning the number that were interpreted.
    pub fn visit_all<S: OutlineSink>(
        &mut self,
        sink: &mut S,
        policy: GlyphErrorPolicy,
    ) -> Result<usize, CFFError> {
        let glyph_count = u16::try_from(self.glyph_count()).map_err(ParseError::from)?;
        let mut visited = 0;
        for glyph_id in 0..glyph_count {
            match self.get_glyph(glyph_id, sink) {
                Ok(Some(_)) => visited += 1,
                Ok(None) => {}
                Err(err)
                    if policy == GlyphErrorPolicy::SkipGlyph
                        && !err.is_font_error()
                        && !matches!(err, CFFError::Quit | CFFError::SinkFailed) =>
                {
                    warn!("skipping glyph {}: {}", glyph_id, err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(visited)
    }

    fn glyph_record(&mut self, glyph_id: GlyphId) -> Result<GlyphRecord, CFFError> {
        let tables = self.glyph_tables()?;
        tables
            .records
            .get(usize::from(glyph_id))
            .copied()
            .ok_or(CFFError::ParseError(ParseError::BadIndex))
    }

    fn glyph_tables(&mut self) -> Result<&mut GlyphTables<'a>, CFFError> {
        let tables = match self.glyphs.take() {
            Some(tables) => tables,
            None => {
                let tables = self.read_glyph_tables()?;
                self.state = ReaderState::GlyphsInitialized;
                tables
            }
        };
        Ok(self.glyphs.insert(tables))
    }

    fn read_glyph_tables(&self) -> Result<GlyphTables<'a>, CFFError> {
        let n_glyphs = self.char_strings.len();
        let glyph_count = u16::try_from(n_glyphs).map_err(ParseError::from)?;
        let mut ctxt = self.scope.offset(self.after_top_dict).ctxt();

        let tables = match &self.kind {
            FontKind::NameKeyed { top_dict } => {
                let strings = StringPool::new(ctxt.read_dep::<Index<'_>>(IndexFormat::Cff)?);
                let global_subrs = ctxt.read_dep::<Index<'_>>(IndexFormat::Cff)?;
                let charset = read_charset(&self.scope, top_dict, n_glyphs)?;
                let encoding = read_encoding(&self.scope, top_dict)?;
                let encodings = GlyphEncodings::new(&encoding, &charset, n_glyphs);
                let records = (0..glyph_count)
                    .map(|glyph_id| GlyphRecord {
                        sid: charset.id_for_glyph(glyph_id),
                        cid: None,
                        font_dict_index: 0,
                    })
                    .collect();
                GlyphTables {
                    global_subrs,
                    strings: Some(strings),
                    charset: Some(charset),
                    encodings: Some(encodings),
                    records,
                    names: None,
                }
            }
            FontKind::CidKeyed {
                top_dict,
                fd_select_offset,
                ..
            } => {
                let strings = StringPool::new(ctxt.read_dep::<Index<'_>>(IndexFormat::Cff)?);
                let global_subrs = ctxt.read_dep::<Index<'_>>(IndexFormat::Cff)?;
                let charset = read_charset(&self.scope, top_dict, n_glyphs)?;
                let fd_select = self
                    .scope
                    .offset(*fd_select_offset)
                    .read_dep::<FDSelect<'_>>(n_glyphs)?;
                let records = (0..glyph_count)
                    .map(|glyph_id| {
                        Ok(GlyphRecord {
                            sid: None,
                            cid: charset.id_for_glyph(glyph_id),
                            font_dict_index: fd_select
                                .font_dict_index(glyph_id)
                                .ok_or(ParseError::BadIndex)?,
                        })
                    })
                    .collect::<Result<_, ParseError>>()?;
                GlyphTables {
                    global_subrs,
                    strings: Some(strings),
                    charset: Some(charset),
                    encodings: None,
                    records,
                    names: None,
                }
            }
            FontKind::Cff2 {
                fd_select_offset, ..
            } => {
                let global_subrs = ctxt.read_dep::<Index<'_>>(IndexFormat::Cff2)?;
                let fd_select = fd_select_offset
                    .map(|offset| self.scope.offset(offset).read_dep::<FDSelect<'_>>(n_glyphs))
                    .transpose()?;
                let records = (0..glyph_count)
                    .map(|glyph_id| {
                        let font_dict_index = match &fd_select {
                            Some(fd_select) => fd_select
                                .font_dict_index(glyph_id)
                                .ok_or(ParseError::BadIndex)?,
                            None => 0,
                        };
                        Ok(GlyphRecord {
                            sid: None,
                            cid: None,
                            font_dict_index,
                        })
                    })
                    .collect::<Result<_, ParseError>>()?;
                GlyphTables {
                    global_subrs,
                    strings: None,
                    charset: None,
                    encodings: None,
                    records,
                    names: None,
                }
            }
        };
        Ok(tables)
    }

    fn select_font_dict(&mut self, font_dict_index: u16) -> Result<(), CFFError> {
        match self.font_dict {
            Some((index, _)) if index == font_dict_index => Ok(()),
            _ => {
                let context = self.read_font_dict(font_dict_index)?;
                self.font_dict = Some((font_dict_index, context));
                Ok(())
            }
        }
    }

    fn read_font_dict(&self, font_dict_index: u16) -> Result<FontDictContext<'a>, ParseError> {
        let scope = &self.scope;
        match &self.kind {
            FontKind::NameKeyed { top_dict } => {
                let (private_dict, offset) = top_dict
                    .read_private_dict::<PrivateDictDefault>(scope, DictArgs::cff(self.options))?;
                font_dict_context(scope, &private_dict, offset, IndexFormat::Cff, None)
            }
            FontKind::CidKeyed { fd_array, .. } => {
                let args = DictArgs::cff(self.options);
                let font_dict = fd_array.read_item::<FontDict>(usize::from(font_dict_index), args)?;
                let font_matrix = font_dict
                    .get(Operator::FontMatrix)
                    .map(FontMatrix::from_operands)
                    .transpose()?;
                let (private_dict, offset) =
                    font_dict.read_private_dict::<PrivateDictDefault>(scope, args)?;
                font_dict_context(scope, &private_dict, offset, IndexFormat::Cff, font_matrix)
            }
            FontKind::Cff2 {
                fd_array, vstore, ..
            } => {
                let font_dict = fd_array.read_item::<cff2::FontDict>(
                    usize::from(font_dict_index),
                    DictArgs::cff2(self.options, None),
                )?;
                let blender = vstore
                    .as_ref()
                    .map(|store| Blender::new(store, &self.coords));
                let (private_dict, offset) = font_dict
                    .read_private_dict::<cff2::PrivateDictDefault>(
                        scope,
                        DictArgs::cff2(self.options, blender),
                    )?;
                font_dict_context(scope, &private_dict, offset, IndexFormat::Cff2, None)
            }
        }
    }
}

impl fmt::Debug for CFFFontReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CFFFontReader")
            .field("state", &self.state)
            .field("font_name", &self.font_name())
            .field("glyph_count", &self.glyph_count())
            .field("cff2", &self.is_cff2())
            .finish()
    }
}

impl OwnedCFFFont {
    /// Read the table directory from `source` and load its CFF2 or, failing that, CFF table.
    pub fn load<S: ByteSource>(source: S, options: ParseOptions) -> Result<Self, CFFError> {
        let mut cursor = SourceCursor::new(source)?;
        let directory = crate::tables::SfntDirectory::load(&mut cursor)?;
        let range = directory
            .locate(tag::CFF2)
            .or_else(|| directory.locate(tag::CFF))
            .ok_or(ParseError::MissingTable(tag::CFF))?;
        Self::load_range(&mut cursor, range, options)
    }

    /// Load the table at `range` from `cursor`.
    pub fn load_range<S: ByteSource>(
        cursor: &mut SourceCursor<S>,
        range: TableRange,
        options: ParseOptions,
    ) -> Result<Self, CFFError> {
        cursor.seek(range.offset)?;
        let data = cursor.read_bytes(range.length)?;
        OwnedCFFFontTryBuilder {
            data,
            reader_builder: |data| CFFFontReader::new(data, options),
        }
        .try_build()
    }

    pub fn glyph_count(&self) -> usize {
        self.with_reader(|reader| reader.glyph_count())
    }

    pub fn get_glyph<S: OutlineSink>(
        &mut self,
        glyph_id: GlyphId,
        sink: &mut S,
    ) -> Result<Option<GlyphMetrics>, CFFError> {
        self.with_reader_mut(|reader| reader.get_glyph(glyph_id, sink))
    }

    pub fn visit_all<S: OutlineSink>(
        &mut self,
        sink: &mut S,
        policy: GlyphErrorPolicy,
    ) -> Result<usize, CFFError> {
        self.with_reader_mut(|reader| reader.visit_all(sink, policy))
    }

    pub fn glyph_name(&mut self, glyph_id: GlyphId) -> Result<Option<String>, CFFError> {
        self.with_reader_mut(|reader| {
            reader
                .glyph_name(glyph_id)
                .map(|name| name.map(String::from))
        })
    }

    pub fn set_variation_coords(&mut self, coords: &[F2Dot14]) {
        self.with_reader_mut(|reader| reader.set_variation_coords(coords))
    }

    pub fn font_matrix(&self) -> Result<FontMatrix, CFFError> {
        self.with_reader(|reader| reader.font_matrix())
    }
}

// A CID-keyed Font DICT matrix applies on top of the Top DICT one, unless either is the default.
fn combine_font_matrix(top: FontMatrix, font_dict: Option<FontMatrix>) -> FontMatrix {
    match font_dict {
        Some(fd) if !fd.is_default() && !top.is_default() => fd.concat(&top),
        Some(fd) if top.is_default() => fd,
        _ => top,
    }
}

fn read_fd_array<'a, T: DictDefault>(
    scope: &ReadScope<'a>,
    top_dict: &Dict<T>,
    format: IndexFormat,
) -> Result<Option<Index<'a>>, ParseError> {
    top_dict
        .get_i32(Operator::FDArray)
        .transpose()?
        .map(|offset| {
            scope
                .offset(usize::try_from(offset)?)
                .read_dep::<Index<'_>>(format)
        })
        .transpose()
}

fn fd_select_offset<T: DictDefault>(top_dict: &Dict<T>) -> Result<Option<usize>, ParseError> {
    top_dict
        .get_i32(Operator::FDSelect)
        .transpose()?
        .map(usize::try_from)
        .transpose()
        .map_err(ParseError::from)
}

fn font_dict_context<'a, T: DictDefault>(
    scope: &ReadScope<'a>,
    private_dict: &Dict<T>,
    private_dict_offset: usize,
    format: IndexFormat,
    font_matrix: Option<FontMatrix>,
) -> Result<FontDictContext<'a>, ParseError> {
    let local_subrs = read_local_subr_index(scope, private_dict, private_dict_offset, format)?;
    if private_dict.get(Operator::BlueValues).is_none() {
        debug!("private dict has no BlueValues");
    }
    let blues = BlueZones {
        blue_values: delta_array(private_dict, Operator::BlueValues)?,
        other_blues: delta_array(private_dict, Operator::OtherBlues)?,
        family_blues: delta_array(private_dict, Operator::FamilyBlues)?,
        family_other_blues: delta_array(private_dict, Operator::FamilyOtherBlues)?,
        stem_snap_h: delta_array(private_dict, Operator::StemSnapH)?,
        stem_snap_v: delta_array(private_dict, Operator::StemSnapV)?,
    };
    let vsindex = private_dict
        .get_i32(Operator::VSIndex)
        .transpose()?
        .map(u16::try_from)
        .transpose()?;

    Ok(FontDictContext {
        local_subrs,
        default_width_x: private_dict
            .get_f64(Operator::DefaultWidthX)
            .transpose()?
            .unwrap_or(0.0),
        nominal_width_x: private_dict
            .get_f64(Operator::NominalWidthX)
            .transpose()?
            .unwrap_or(0.0),
        font_matrix,
        language_group: private_dict
            .get_i32(Operator::LanguageGroup)
            .transpose()?
            .unwrap_or(0),
        vsindex: vsindex.unwrap_or(0),
        blues,
    })
}

fn delta_array<T: DictDefault>(
    dict: &Dict<T>,
    operator: Operator,
) -> Result<Vec<crate::cff::blend::BlendValue>, ParseError> {
    Ok(dict.get_delta_array(operator).transpose()?.unwrap_or_default())
}

fn glyph_names<'a>(tables: &GlyphTables<'a>) -> FxHashMap<&'a [u8], GlyphId> {
    let mut names = FxHashMap::default();
    let strings = match &tables.strings {
        Some(strings) => strings,
        None => return names,
    };
    for (glyph_id, record) in (0..=u16::MAX).zip(tables.records.iter()) {
        let name = record.sid.and_then(|sid| strings.get_bytes(sid).ok());
        if let Some(name) = name {
            names.entry(name).or_insert(glyph_id);
        }
    }
    names
}
