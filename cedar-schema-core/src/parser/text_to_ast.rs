/*
 * Copyright Cedar Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Recursive-descent parser from [`Token`]s to the schema AST.

use nonempty::NonEmpty;
use smol_str::SmolStr;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::err::{ParseError, ParseErrorKind, Result};
use super::lexer::{Scanner, Token, TokenKind};
use super::Loc;
use crate::ast::{
    Action, ActionRef, Annotations, AppliesTo, Attribute, CommonType, EntityType, Id, Name,
    PrimitiveType, RecordType, Schema, Type, RESERVED_ID,
};
use crate::err::DuplicateKind;
use crate::extensions::Extensions;
use crate::nesting::{stack_exhausted, too_deep};

const DECL_START: &str = "`namespace`, `entity`, `action`, `type` or `@`";

/// Which entries of an `appliesTo` block have been seen
#[derive(Debug, Default)]
struct AppliesToEntries {
    principal: Option<Vec<Name>>,
    resource: Option<Vec<Name>>,
    context: Option<Type>,
}

/// One-token lookahead plus a small buffer for peeking further ahead
#[derive(Debug)]
pub(crate) struct Parser<'src> {
    scanner: Scanner<'src>,
    lookahead: VecDeque<Token<'src>>,
    schema: Schema,
    namespace_blocks: BTreeSet<Name>,
    /// `Set` and record types currently open
    depth: usize,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(filename: &str, src: &'src str) -> Self {
        Self {
            scanner: Scanner::new(filename, src),
            lookahead: VecDeque::new(),
            schema: Schema::new(),
            namespace_blocks: BTreeSet::new(),
            depth: 0,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Schema> {
        self.decls(None, TokenKind::Eof)?;
        Ok(self.schema)
    }

    fn peek_nth(&mut self, n: usize) -> Result<&Token<'src>> {
        while self.lookahead.len() <= n {
            let tok = self.scanner.next_token()?;
            self.lookahead.push_back(tok);
        }
        // PANIC SAFETY: the loop above leaves more than `n` tokens in the buffer
        #[allow(clippy::indexing_slicing)]
        Ok(&self.lookahead[n])
    }

    fn peek(&mut self) -> Result<&Token<'src>> {
        self.peek_nth(0)
    }

    fn peek_kind(&mut self) -> Result<TokenKind> {
        Ok(self.peek()?.kind)
    }

    fn peek_is_ident(&mut self, word: &str) -> Result<bool> {
        Ok(self.peek()?.is_ident(word))
    }

    fn next(&mut self) -> Result<Token<'src>> {
        match self.lookahead.pop_front() {
            Some(tok) => Ok(tok),
            None => self.scanner.next_token(),
        }
    }

    /// Consume the next token if it has kind `kind`
    fn eat(&mut self, kind: TokenKind) -> Result<bool> {
        if self.peek_kind()? == kind {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>> {
        let tok = self.next()?;
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(unexpected(&tok, kind.to_string()))
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Result<Token<'src>> {
        let tok = self.next()?;
        if tok.is_ident(word) {
            Ok(tok)
        } else {
            Err(unexpected(&tok, format!("`{word}`")))
        }
    }

    /// An identifier in name position, which may not be `in`
    fn ident(&mut self) -> Result<(Id, Loc)> {
        let tok = self.expect(TokenKind::Ident)?;
        if tok.text == RESERVED_ID {
            return Err(ParseError::new(ParseErrorKind::Reserved, tok.loc));
        }
        Ok((Id::new_unchecked(tok.text), tok.loc))
    }

    /// `ident ('::' ident)*`
    fn path(&mut self) -> Result<(Name, Loc)> {
        let (first, first_loc) = self.ident()?;
        let mut components = vec![first];
        let mut end = first_loc.clone();
        while self.eat(TokenKind::DoubleColon)? {
            let (id, loc) = self.ident()?;
            components.push(id);
            end = loc;
        }
        let loc = span(&first_loc, &end);
        let name = Name::from_components(components).ok_or_else(|| {
            ParseError::new(ParseErrorKind::unexpected("a name", "nothing"), loc.clone())
        })?;
        Ok((name, loc))
    }

    /// `decl*` up to (but not including) a token of kind `end`
    fn decls(&mut self, ns: Option<&Name>, end: TokenKind) -> Result<()> {
        while self.peek_kind()? != end {
            let annotations = self.annotations()?;
            let keyword = match self.peek()? {
                tok if tok.kind == TokenKind::Ident => tok.text,
                _ => "",
            };
            match keyword {
                "namespace" => self.namespace(ns, annotations)?,
                "entity" => self.entity(ns, annotations)?,
                "action" => self.action(ns, annotations)?,
                "type" => self.common_type(ns, annotations)?,
                _ => {
                    let tok = self.next()?;
                    return Err(unexpected(&tok, DECL_START));
                }
            }
        }
        Ok(())
    }

    /// `annotation*`
    fn annotations(&mut self) -> Result<Annotations> {
        let mut annotations = Annotations::new();
        while self.eat(TokenKind::At)? {
            let (key, loc) = self.ident()?;
            let value = if self.eat(TokenKind::LParen)? {
                let value = self.expect(TokenKind::String)?.value;
                self.expect(TokenKind::RParen)?;
                value
            } else {
                SmolStr::default()
            };
            let name = key.clone().into_smolstr();
            if annotations.insert(key, value).is_some() {
                return Err(duplicate(DuplicateKind::Annotation, name, loc));
            }
        }
        Ok(annotations)
    }

    fn namespace(&mut self, outer: Option<&Name>, annotations: Annotations) -> Result<()> {
        self.expect_keyword("namespace")?;
        let (path, loc) = self.path()?;
        if stack_exhausted() {
            return Err(ParseError::new(ParseErrorKind::NamespacesTooDeep, loc));
        }
        let full = match outer {
            Some(outer) => outer.join(&path),
            None => path,
        };
        if !self.namespace_blocks.insert(full.clone()) {
            return Err(duplicate(
                DuplicateKind::Namespace,
                full.to_string(),
                loc,
            ));
        }
        self.expect(TokenKind::LBrace)?;
        self.schema.namespace_mut(Some(full.clone())).annotations = annotations;
        self.decls(Some(&full), TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace)?;
        Ok(())
    }

    fn entity(&mut self, ns: Option<&Name>, annotations: Annotations) -> Result<()> {
        self.expect_keyword("entity")?;
        if self.peek_kind()? == TokenKind::Ident && self.peek_nth(1)?.is_ident("enum") {
            return self.enum_entity(ns, annotations);
        }
        let mut names = vec![self.ident()?];
        while self.eat(TokenKind::Comma)? {
            names.push(self.ident()?);
        }
        let member_of = if self.peek_is_ident("in")? {
            self.next()?;
            self.entity_ref_list()?
        } else {
            Vec::new()
        };
        let shape = if self.eat(TokenKind::Equals)? || self.peek_kind()? == TokenKind::LBrace {
            Some(self.record()?)
        } else {
            None
        };
        let tags = if self.peek_is_ident("tags")? {
            self.next()?;
            Some(self.ty()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        for (id, loc) in names {
            let mut ety =
                EntityType::standard(member_of.iter().cloned(), shape.clone(), tags.clone());
            ety.annotations = annotations.clone();
            self.declare_entity(ns, id, loc, ety)?;
        }
        Ok(())
    }

    /// `ident 'enum' '[' string (',' string)* ']' ';'`, after `entity`
    fn enum_entity(&mut self, ns: Option<&Name>, annotations: Annotations) -> Result<()> {
        let (id, loc) = self.ident()?;
        self.expect_keyword("enum")?;
        self.expect(TokenKind::LBracket)?;
        let first = self.expect(TokenKind::String)?;
        let mut seen = BTreeSet::from([first.value.clone()]);
        let mut choices = NonEmpty::new(first.value);
        while self.eat(TokenKind::Comma)? {
            let tok = self.expect(TokenKind::String)?;
            if !seen.insert(tok.value.clone()) {
                return Err(duplicate(DuplicateKind::EnumValue, tok.value, tok.loc));
            }
            choices.push(tok.value);
        }
        self.expect(TokenKind::RBracket)?;
        self.expect(TokenKind::Semicolon)?;
        let mut ety = EntityType::enumeration(choices);
        ety.annotations = annotations;
        self.declare_entity(ns, id, loc, ety)
    }

    fn declare_entity(&mut self, ns: Option<&Name>, id: Id, loc: Loc, mut ety: EntityType) -> Result<()> {
        let def = self.schema.namespace_mut(ns.cloned());
        match def.entity_types.entry(id) {
            Entry::Occupied(existing) => {
                let name = existing.key().clone().into_smolstr();
                let kind = if existing.get().is_enum() == ety.is_enum() {
                    ParseErrorKind::Duplicate {
                        kind: DuplicateKind::EntityType,
                        name,
                    }
                } else {
                    ParseErrorKind::EntityEnumConflict(name)
                };
                Err(ParseError::new(kind, loc))
            }
            Entry::Vacant(slot) => {
                ety.loc = Some(loc);
                slot.insert(ety);
                Ok(())
            }
        }
    }

    /// `path | '[' (path (',' path)*)? ']'`
    fn entity_ref_list(&mut self) -> Result<Vec<Name>> {
        if !self.eat(TokenKind::LBracket)? {
            return Ok(vec![self.path()?.0]);
        }
        let mut refs = Vec::new();
        if self.eat(TokenKind::RBracket)? {
            return Ok(refs);
        }
        refs.push(self.path()?.0);
        while self.eat(TokenKind::Comma)? {
            refs.push(self.path()?.0);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(refs)
    }

    /// `'{' (attr (',' attr)*)? ','? '}'`
    fn record(&mut self) -> Result<RecordType> {
        let open = self.expect(TokenKind::LBrace)?;
        self.enter(open.loc)?;
        let mut attributes = BTreeMap::new();
        while self.peek_kind()? != TokenKind::RBrace {
            let annotations = self.annotations()?;
            let key = self.next()?;
            let name = match key.kind {
                TokenKind::Ident if key.text == RESERVED_ID => {
                    return Err(ParseError::new(ParseErrorKind::Reserved, key.loc))
                }
                TokenKind::Ident | TokenKind::String => key.value.clone(),
                _ => return Err(unexpected(&key, "attribute name")),
            };
            let required = !self.eat(TokenKind::Question)?;
            self.expect(TokenKind::Colon)?;
            let ty = self.ty()?;
            match attributes.entry(name) {
                Entry::Occupied(e) => {
                    return Err(duplicate(DuplicateKind::Attribute, e.key().clone(), key.loc))
                }
                Entry::Vacant(e) => {
                    e.insert(Attribute {
                        ty,
                        required,
                        annotations,
                    });
                }
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        self.depth -= 1;
        Ok(RecordType {
            attributes,
            annotations: Annotations::new(),
        })
    }

    /// Open one more nested `Set` or record type, which starts at `loc`
    fn enter(&mut self, loc: Loc) -> Result<()> {
        self.depth += 1;
        if too_deep(self.depth) {
            return Err(ParseError::new(ParseErrorKind::NestingTooDeep, loc));
        }
        Ok(())
    }

    fn ty(&mut self) -> Result<Type> {
        let (kind, text) = {
            let tok = self.peek()?;
            (tok.kind, tok.text)
        };
        match kind {
            TokenKind::LBrace => Ok(Type::Record(self.record()?)),
            TokenKind::Ident if text == "Set" && self.peek_nth(1)?.kind == TokenKind::LAngle => {
                let set = self.next()?;
                self.next()?;
                self.enter(set.loc)?;
                let element = self.ty()?;
                self.expect(TokenKind::RAngle)?;
                self.depth -= 1;
                Ok(Type::set(element))
            }
            TokenKind::Ident => {
                let (name, loc) = self.path()?;
                if name.is_unqualified() {
                    match name.basename().as_str() {
                        "String" => return Ok(PrimitiveType::String.into()),
                        "Long" => return Ok(PrimitiveType::Long.into()),
                        "Bool" => return Ok(PrimitiveType::Bool.into()),
                        _ => (),
                    }
                }
                match name.as_builtin() {
                    Some(id) => {
                        if let Some(prim) = PrimitiveType::from_name(id.as_str()) {
                            Ok(prim.into())
                        } else if Extensions::is_known(id.as_str()) {
                            Ok(Type::Extension(id.clone()))
                        } else {
                            Err(ParseError::new(
                                ParseErrorKind::UnknownExtension(SmolStr::new(id.as_str())),
                                loc,
                            ))
                        }
                    }
                    None => Ok(Type::EntityOrCommon(name)),
                }
            }
            _ => {
                let tok = self.next()?;
                Err(unexpected(&tok, "type"))
            }
        }
    }

    fn action(&mut self, ns: Option<&Name>, annotations: Annotations) -> Result<()> {
        self.expect_keyword("action")?;
        let mut names = vec![self.action_name()?];
        while self.eat(TokenKind::Comma)? {
            names.push(self.action_name()?);
        }
        let member_of = if self.peek_is_ident("in")? {
            self.next()?;
            self.action_ref_list()?
        } else {
            Vec::new()
        };
        let applies_to = if self.peek_is_ident("appliesTo")? {
            self.next()?;
            Some(self.applies_to()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        let def = self.schema.namespace_mut(ns.cloned());
        for (name, loc) in names {
            match def.actions.entry(name) {
                Entry::Occupied(e) => {
                    return Err(duplicate(DuplicateKind::Action, e.key().clone(), loc))
                }
                Entry::Vacant(e) => {
                    e.insert(Action {
                        member_of: member_of.clone(),
                        applies_to: applies_to.clone(),
                        annotations: annotations.clone(),
                        loc: Some(loc),
                    });
                }
            }
        }
        Ok(())
    }

    /// An action name: any string literal, or an identifier other than `in`
    fn action_name(&mut self) -> Result<(SmolStr, Loc)> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::String => Ok((tok.value, tok.loc)),
            TokenKind::Ident if tok.text == RESERVED_ID => {
                Err(ParseError::new(ParseErrorKind::Reserved, tok.loc))
            }
            TokenKind::Ident => Ok((tok.value, tok.loc)),
            _ => Err(unexpected(&tok, "action name")),
        }
    }

    fn action_ref_list(&mut self) -> Result<Vec<ActionRef>> {
        if !self.eat(TokenKind::LBracket)? {
            return Ok(vec![self.action_ref()?]);
        }
        let mut refs = Vec::new();
        if self.eat(TokenKind::RBracket)? {
            return Ok(refs);
        }
        refs.push(self.action_ref()?);
        while self.eat(TokenKind::Comma)? {
            refs.push(self.action_ref()?);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(refs)
    }

    /// `(path '::')? string | ident`
    fn action_ref(&mut self) -> Result<ActionRef> {
        if self.peek_kind()? == TokenKind::String {
            let tok = self.next()?;
            return Ok(ActionRef::default_type(tok.value));
        }
        let (first, _) = self.ident()?;
        if self.peek_kind()? != TokenKind::DoubleColon {
            return Ok(ActionRef::default_type(first.into_smolstr()));
        }
        let mut components = vec![first];
        loop {
            self.expect(TokenKind::DoubleColon)?;
            if self.peek_kind()? == TokenKind::String {
                let id = self.next()?.value;
                let ty = Name::from_components(components);
                return Ok(ActionRef { ty, id });
            }
            components.push(self.ident()?.0);
            if self.peek_kind()? != TokenKind::DoubleColon {
                let tok = self.next()?;
                return Err(unexpected(&tok, "`::` followed by an action name string"));
            }
        }
    }

    /// `'{' (entry (',' entry)*)? ','? '}'`, after `appliesTo`
    fn applies_to(&mut self) -> Result<AppliesTo> {
        self.expect(TokenKind::LBrace)?;
        let mut entries = AppliesToEntries::default();
        while self.peek_kind()? != TokenKind::RBrace {
            let key = self.expect(TokenKind::Ident)?;
            let already_seen = match key.text {
                "principal" => entries.principal.is_some(),
                "resource" => entries.resource.is_some(),
                "context" => entries.context.is_some(),
                _ => return Err(unexpected(&key, "`principal`, `resource` or `context`")),
            };
            if already_seen {
                return Err(duplicate(DuplicateKind::AppliesToEntry, key.value, key.loc));
            }
            self.expect(TokenKind::Colon)?;
            match key.text {
                "principal" => entries.principal = Some(self.entity_ref_list()?),
                "resource" => entries.resource = Some(self.entity_ref_list()?),
                _ => entries.context = Some(self.ty()?),
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(AppliesTo {
            principal_types: entries.principal.unwrap_or_default(),
            resource_types: entries.resource.unwrap_or_default(),
            context: entries.context,
        })
    }

    /// `'type' ident '=' type ';'`
    fn common_type(&mut self, ns: Option<&Name>, annotations: Annotations) -> Result<()> {
        self.expect_keyword("type")?;
        let (id, loc) = self.ident()?;
        self.expect(TokenKind::Equals)?;
        let ty = self.ty()?;
        self.expect(TokenKind::Semicolon)?;
        let def = self.schema.namespace_mut(ns.cloned());
        match def.common_types.entry(id) {
            Entry::Occupied(e) => Err(duplicate(
                DuplicateKind::CommonType,
                e.key().clone().into_smolstr(),
                loc,
            )),
            Entry::Vacant(e) => {
                e.insert(CommonType {
                    ty,
                    annotations,
                    loc: Some(loc),
                });
                Ok(())
            }
        }
    }
}

fn unexpected(tok: &Token<'_>, expected: impl Into<SmolStr>) -> ParseError {
    ParseError::new(
        ParseErrorKind::unexpected(expected, tok.describe()),
        tok.loc.clone(),
    )
}

fn duplicate(kind: DuplicateKind, name: impl Into<SmolStr>, loc: Loc) -> ParseError {
    ParseError::new(
        ParseErrorKind::Duplicate {
            kind,
            name: name.into(),
        },
        loc,
    )
}

/// The location from the start of `first` to the end of `last`
fn span(first: &Loc, last: &Loc) -> Loc {
    let len = (last.span.offset() + last.span.len()).saturating_sub(first.span.offset());
    Loc::new(first.start, len, first.src.clone(), first.filename.clone())
}
